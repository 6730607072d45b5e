use chrono::{DateTime, NaiveDate, Utc};

use crate::model::document::{ChecklistItem, Day, Document, Phase, Week};
use crate::util::clock::{stamp, IdGenerator};

/// Path to a structural node. Week and day ids are only unique among their
/// siblings, so the full ancestry is always carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRef {
    Phase {
        phase_id: String,
    },
    Week {
        phase_id: String,
        week_id: String,
    },
    Day {
        phase_id: String,
        week_id: String,
        day_id: String,
    },
}

impl NodeRef {
    pub fn kind(&self) -> &'static str {
        match self {
            NodeRef::Phase { .. } => "phase",
            NodeRef::Week { .. } => "week",
            NodeRef::Day { .. } => "day",
        }
    }
}

/// Path to one of the three checklist collections
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecklistRef {
    Goals {
        phase_id: String,
    },
    Objectives {
        phase_id: String,
        week_id: String,
    },
    Tasks {
        phase_id: String,
        week_id: String,
        day_id: String,
    },
}

pub fn checklist<'a>(doc: &'a Document, list: &ChecklistRef) -> Option<&'a Vec<ChecklistItem>> {
    match list {
        ChecklistRef::Goals { phase_id } => doc.phase(phase_id).map(|p| &p.goals),
        ChecklistRef::Objectives { phase_id, week_id } => {
            doc.week(phase_id, week_id).map(|w| &w.objectives)
        }
        ChecklistRef::Tasks {
            phase_id,
            week_id,
            day_id,
        } => doc.day(phase_id, week_id, day_id).map(|d| &d.tasks),
    }
}

pub fn checklist_mut<'a>(
    doc: &'a mut Document,
    list: &ChecklistRef,
) -> Option<&'a mut Vec<ChecklistItem>> {
    match list {
        ChecklistRef::Goals { phase_id } => doc.phase_mut(phase_id).map(|p| &mut p.goals),
        ChecklistRef::Objectives { phase_id, week_id } => {
            doc.week_mut(phase_id, week_id).map(|w| &mut w.objectives)
        }
        ChecklistRef::Tasks {
            phase_id,
            week_id,
            day_id,
        } => doc.day_mut(phase_id, week_id, day_id).map(|d| &mut d.tasks),
    }
}

/// Trimmed input, or `None` when nothing is left
fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// ---------------------------------------------------------------------------
// Structural nodes
// ---------------------------------------------------------------------------

/// Append a new phase. Returns its id, or `None` for an empty title.
pub fn create_phase(
    doc: &mut Document,
    ids: &mut IdGenerator,
    now: DateTime<Utc>,
    title: &str,
) -> Option<String> {
    let title = non_empty(title)?;
    let id = ids.next_id(now);
    doc.phases.push(Phase::new(id.clone(), title));
    Some(id)
}

pub fn create_week(
    doc: &mut Document,
    ids: &mut IdGenerator,
    now: DateTime<Utc>,
    phase_id: &str,
    title: &str,
) -> Option<String> {
    let title = non_empty(title)?;
    let phase = doc.phase_mut(phase_id)?;
    let id = ids.next_id(now);
    phase.weeks.push(Week::new(id.clone(), title));
    Some(id)
}

pub fn create_day(
    doc: &mut Document,
    ids: &mut IdGenerator,
    now: DateTime<Utc>,
    phase_id: &str,
    week_id: &str,
    title: &str,
) -> Option<String> {
    let title = non_empty(title)?;
    let week = doc.week_mut(phase_id, week_id)?;
    let id = ids.next_id(now);
    week.days.push(Day::new(id.clone(), title));
    Some(id)
}

/// Rename a phase, week or day. No-op on an empty title or missing node.
pub fn rename_node(doc: &mut Document, node: &NodeRef, title: &str) -> bool {
    let Some(title) = non_empty(title) else {
        return false;
    };
    let slot = match node {
        NodeRef::Phase { phase_id } => doc.phase_mut(phase_id).map(|p| &mut p.title),
        NodeRef::Week { phase_id, week_id } => doc.week_mut(phase_id, week_id).map(|w| &mut w.title),
        NodeRef::Day {
            phase_id,
            week_id,
            day_id,
        } => doc.day_mut(phase_id, week_id, day_id).map(|d| &mut d.title),
    };
    match slot {
        Some(slot) => {
            *slot = title;
            true
        }
        None => false,
    }
}

/// Set the subtitle of a phase or week. Days have a date instead.
pub fn set_subtitle(doc: &mut Document, node: &NodeRef, subtitle: &str) -> bool {
    let Some(subtitle) = non_empty(subtitle) else {
        return false;
    };
    let slot = match node {
        NodeRef::Phase { phase_id } => doc.phase_mut(phase_id).map(|p| &mut p.subtitle),
        NodeRef::Week { phase_id, week_id } => {
            doc.week_mut(phase_id, week_id).map(|w| &mut w.subtitle)
        }
        NodeRef::Day { .. } => None,
    };
    match slot {
        Some(slot) => {
            *slot = subtitle;
            true
        }
        None => false,
    }
}

/// Parse a `YYYY-MM-DD` calendar date
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Put a day on the calendar. No-op on an invalid date.
pub fn assign_date(doc: &mut Document, phase_id: &str, week_id: &str, day_id: &str, date: &str) -> bool {
    let Some(date) = parse_date(date) else {
        return false;
    };
    match doc.day_mut(phase_id, week_id, day_id) {
        Some(day) => {
            day.assigned_date = Some(date.format("%Y-%m-%d").to_string());
            true
        }
        None => false,
    }
}

pub fn clear_date(doc: &mut Document, phase_id: &str, week_id: &str, day_id: &str) -> bool {
    match doc.day_mut(phase_id, week_id, day_id) {
        Some(day) if day.assigned_date.is_some() => {
            day.assigned_date = None;
            true
        }
        _ => false,
    }
}

/// Remove a node and its whole subtree. Returns whether anything was removed.
pub fn delete_node(doc: &mut Document, node: &NodeRef) -> bool {
    match node {
        NodeRef::Phase { phase_id } => {
            let before = doc.phases.len();
            doc.phases.retain(|p| &p.id != phase_id);
            doc.phases.len() != before
        }
        NodeRef::Week { phase_id, week_id } => match doc.phase_mut(phase_id) {
            Some(phase) => {
                let before = phase.weeks.len();
                phase.weeks.retain(|w| &w.id != week_id);
                phase.weeks.len() != before
            }
            None => false,
        },
        NodeRef::Day {
            phase_id,
            week_id,
            day_id,
        } => match doc.week_mut(phase_id, week_id) {
            Some(week) => {
                let before = week.days.len();
                week.days.retain(|d| &d.id != day_id);
                week.days.len() != before
            }
            None => false,
        },
    }
}

// ---------------------------------------------------------------------------
// Checklist items
// ---------------------------------------------------------------------------

pub fn add_checklist_item(doc: &mut Document, list: &ChecklistRef, text: &str) -> bool {
    let Some(text) = non_empty(text) else {
        return false;
    };
    match checklist_mut(doc, list) {
        Some(items) => {
            items.push(ChecklistItem::new(text));
            true
        }
        None => false,
    }
}

pub fn edit_checklist_item(doc: &mut Document, list: &ChecklistRef, index: usize, text: &str) -> bool {
    let Some(text) = non_empty(text) else {
        return false;
    };
    match checklist_mut(doc, list).and_then(|items| items.get_mut(index)) {
        Some(item) => {
            item.text = text;
            true
        }
        None => false,
    }
}

pub fn delete_checklist_item(doc: &mut Document, list: &ChecklistRef, index: usize) -> bool {
    match checklist_mut(doc, list) {
        Some(items) if index < items.len() => {
            items.remove(index);
            true
        }
        _ => false,
    }
}

/// Flip an item's completion. Returns the new state.
///
/// A recurring item that becomes completed records `now` as its
/// `lastCompleted`.
pub fn toggle_completion(
    doc: &mut Document,
    list: &ChecklistRef,
    index: usize,
    now: DateTime<Utc>,
) -> Option<bool> {
    let item = checklist_mut(doc, list)?.get_mut(index)?;
    item.completed = !item.completed;
    if item.completed && item.recurring.is_recurring() {
        item.last_completed = Some(stamp(now));
    }
    Some(item.completed)
}

/// Move the element at `from` so that it ends up at index `to`, keeping the
/// relative order of everything else. Out-of-range indices are a no-op.
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from >= items.len() || to >= items.len() {
        return false;
    }
    if from == to {
        return true;
    }
    let item = items.remove(from);
    items.insert(to, item);
    true
}

/// Convert a drop slot (insert before the element currently at `slot`,
/// `slot == len` meaning the end) into the final index for [`move_item`].
/// Removing the dragged element first shifts later slots down by one.
pub fn resolve_drop_slot(from: usize, slot: usize) -> usize {
    if from < slot { slot - 1 } else { slot }
}

pub fn reorder_task(doc: &mut Document, list: &ChecklistRef, from: usize, to: usize) -> bool {
    match checklist_mut(doc, list) {
        Some(items) => move_item(items, from, to),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use crate::model::document::Recurrence;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    /// phase → week → day with tasks A, B, C, D
    fn sample() -> (Document, ChecklistRef) {
        let mut doc = Document::default();
        let mut ids = IdGenerator::new();
        let p = create_phase(&mut doc, &mut ids, now(), "Phase 1").unwrap();
        let w = create_week(&mut doc, &mut ids, now(), &p, "Week 01").unwrap();
        let d = create_day(&mut doc, &mut ids, now(), &p, &w, "Day 01").unwrap();
        let list = ChecklistRef::Tasks {
            phase_id: p,
            week_id: w,
            day_id: d,
        };
        for t in ["A", "B", "C", "D"] {
            assert!(add_checklist_item(&mut doc, &list, t));
        }
        (doc, list)
    }

    fn texts(doc: &Document, list: &ChecklistRef) -> Vec<String> {
        checklist(doc, list)
            .unwrap()
            .iter()
            .map(|i| i.text.clone())
            .collect()
    }

    #[test]
    fn create_assigns_distinct_ids_in_append_order() {
        let mut doc = Document::default();
        let mut ids = IdGenerator::new();
        let a = create_phase(&mut doc, &mut ids, now(), "A").unwrap();
        let b = create_phase(&mut doc, &mut ids, now(), "B").unwrap();
        assert_ne!(a, b);
        assert_eq!(doc.phases[0].title, "A");
        assert_eq!(doc.phases[1].title, "B");
        assert_eq!(doc.phases[0].subtitle, "New Phase");
    }

    #[test]
    fn create_rejects_empty_titles() {
        let mut doc = Document::default();
        let mut ids = IdGenerator::new();
        assert!(create_phase(&mut doc, &mut ids, now(), "   ").is_none());
        assert!(doc.phases.is_empty());
        assert!(create_week(&mut doc, &mut ids, now(), "missing", "Week").is_none());
    }

    #[test]
    fn rename_is_noop_on_empty() {
        let (mut doc, list) = sample();
        let ChecklistRef::Tasks { phase_id, week_id, day_id } = list else { unreachable!() };
        let day = NodeRef::Day { phase_id: phase_id.clone(), week_id, day_id };
        assert!(!rename_node(&mut doc, &day, ""));
        assert!(rename_node(&mut doc, &day, "Kickoff"));
        assert_eq!(doc.phases[0].weeks[0].days[0].title, "Kickoff");
        assert!(rename_node(&mut doc, &NodeRef::Phase { phase_id }, "Foundations"));
        assert_eq!(doc.phases[0].title, "Foundations");
    }

    #[test]
    fn subtitle_only_for_phase_and_week() {
        let (mut doc, list) = sample();
        let ChecklistRef::Tasks { phase_id, week_id, day_id } = list else { unreachable!() };
        let week = NodeRef::Week { phase_id: phase_id.clone(), week_id: week_id.clone() };
        assert!(set_subtitle(&mut doc, &week, "Ramp-up"));
        assert_eq!(doc.phases[0].weeks[0].subtitle, "Ramp-up");
        let day = NodeRef::Day { phase_id, week_id, day_id };
        assert!(!set_subtitle(&mut doc, &day, "nope"));
    }

    #[test]
    fn assign_date_validates() {
        let (mut doc, list) = sample();
        let ChecklistRef::Tasks { phase_id, week_id, day_id } = list else { unreachable!() };
        assert!(!assign_date(&mut doc, &phase_id, &week_id, &day_id, "2025-02-30"));
        assert!(!assign_date(&mut doc, &phase_id, &week_id, &day_id, "tomorrow"));
        assert_eq!(doc.phases[0].weeks[0].days[0].assigned_date, None);
        assert!(assign_date(&mut doc, &phase_id, &week_id, &day_id, "2025-03-04"));
        assert_eq!(
            doc.phases[0].weeks[0].days[0].assigned_date.as_deref(),
            Some("2025-03-04")
        );
        assert!(clear_date(&mut doc, &phase_id, &week_id, &day_id));
        assert!(!clear_date(&mut doc, &phase_id, &week_id, &day_id));
    }

    #[test]
    fn delete_phase_cascades() {
        let (mut doc, list) = sample();
        let ChecklistRef::Tasks { phase_id, .. } = &list else { unreachable!() };
        assert!(delete_node(&mut doc, &NodeRef::Phase { phase_id: phase_id.clone() }));
        assert!(doc.phases.is_empty());
        assert!(checklist(&doc, &list).is_none());
        assert!(!delete_node(&mut doc, &NodeRef::Phase { phase_id: phase_id.clone() }));
    }

    #[test]
    fn delete_day_leaves_siblings() {
        let (mut doc, list) = sample();
        let ChecklistRef::Tasks { phase_id, week_id, day_id } = list else { unreachable!() };
        let mut ids = IdGenerator::new();
        let later = now() + chrono::Duration::seconds(5);
        let other = create_day(&mut doc, &mut ids, later, &phase_id, &week_id, "Day 02").unwrap();
        assert!(delete_node(&mut doc, &NodeRef::Day { phase_id, week_id, day_id }));
        let days = &doc.phases[0].weeks[0].days;
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].id, other);
    }

    #[test]
    fn checklist_add_edit_delete() {
        let (mut doc, list) = sample();
        assert!(!add_checklist_item(&mut doc, &list, " "));
        assert!(edit_checklist_item(&mut doc, &list, 1, "Bee"));
        assert!(!edit_checklist_item(&mut doc, &list, 9, "x"));
        assert!(delete_checklist_item(&mut doc, &list, 0));
        assert!(!delete_checklist_item(&mut doc, &list, 9));
        assert_eq!(texts(&doc, &list), vec!["Bee", "C", "D"]);
    }

    #[test]
    fn toggle_flips_and_stamps_recurring() {
        let (mut doc, list) = sample();
        assert_eq!(toggle_completion(&mut doc, &list, 0, now()), Some(true));
        assert_eq!(checklist(&doc, &list).unwrap()[0].last_completed, None);
        assert_eq!(toggle_completion(&mut doc, &list, 0, now()), Some(false));

        checklist_mut(&mut doc, &list).unwrap()[1].recurring = Recurrence::Daily;
        assert_eq!(toggle_completion(&mut doc, &list, 1, now()), Some(true));
        assert_eq!(
            checklist(&doc, &list).unwrap()[1].last_completed.as_deref(),
            Some("2025-03-01T09:00:00Z")
        );
        assert_eq!(toggle_completion(&mut doc, &list, 7, now()), None);
    }

    #[test]
    fn reorder_forward_and_backward() {
        let (mut doc, list) = sample();
        assert!(reorder_task(&mut doc, &list, 0, 2));
        assert_eq!(texts(&doc, &list), vec!["B", "C", "A", "D"]);

        let (mut doc, list) = sample();
        assert!(reorder_task(&mut doc, &list, 3, 0));
        assert_eq!(texts(&doc, &list), vec!["D", "A", "B", "C"]);
    }

    #[test]
    fn reorder_out_of_range_is_noop() {
        let (mut doc, list) = sample();
        assert!(!reorder_task(&mut doc, &list, 4, 0));
        assert!(!reorder_task(&mut doc, &list, 0, 4));
        assert_eq!(texts(&doc, &list), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn drop_slot_accounts_for_removal() {
        // Dropping A just before D (slot 3) lands it at index 2.
        assert_eq!(resolve_drop_slot(0, 3), 2);
        // Dropping D at the top.
        assert_eq!(resolve_drop_slot(3, 0), 0);
        // Dropping A at the very end.
        assert_eq!(resolve_drop_slot(0, 4), 3);

        let mut v = vec!['A', 'B', 'C', 'D'];
        move_item(&mut v, 0, resolve_drop_slot(0, 3));
        assert_eq!(v, vec!['B', 'C', 'A', 'D']);
    }
}
