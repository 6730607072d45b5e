use serde::{Deserialize, Serialize};

use crate::model::document::{ChecklistItem, Day, Document, Phase, Week};
use crate::ops::calendar::DayLocation;
use crate::ops::tree_ops::{ChecklistRef, NodeRef};

/// Which view the cursor shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Home,
    Phase,
    Week,
    Day,
    Task,
    /// Notes, videos, files and links of the current day
    Materials,
    Analytics,
    Archive,
}

impl View {
    /// Side-views sit beside the tree and leave the tree location alone
    pub fn is_side_view(self) -> bool {
        matches!(self, View::Materials | View::Analytics | View::Archive)
    }
}

/// The single focus pointer into the tree.
///
/// Not a stack: leaving a side-view returns to whatever tree location is
/// still recorded. Tasks are addressed by position, so deleting or moving an
/// earlier sibling makes `task_index` point at a different task.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub view: View,
    pub phase_id: Option<String>,
    pub week_id: Option<String>,
    pub day_id: Option<String>,
    pub task_index: Option<usize>,
}

/// What a cursor points at after looking it up in the document
#[derive(Debug, Clone, Copy)]
pub enum Focus<'a> {
    Home,
    Phase(&'a Phase),
    Week(&'a Phase, &'a Week),
    Day(&'a Phase, &'a Week, &'a Day),
    Task(&'a Day, usize, &'a ChecklistItem),
    Materials(&'a Day),
    Analytics,
    Archive,
}

impl Cursor {
    pub fn home() -> Self {
        Cursor::default()
    }

    pub fn go_home(&mut self) {
        *self = Cursor::home();
    }

    pub fn open_phase(&mut self, phase_id: &str) {
        self.view = View::Phase;
        self.phase_id = Some(phase_id.to_string());
        self.week_id = None;
        self.day_id = None;
        self.task_index = None;
    }

    pub fn open_week(&mut self, week_id: &str) {
        self.view = View::Week;
        self.week_id = Some(week_id.to_string());
        self.day_id = None;
        self.task_index = None;
    }

    pub fn open_day(&mut self, day_id: &str) {
        self.view = View::Day;
        self.day_id = Some(day_id.to_string());
        self.task_index = None;
    }

    pub fn open_task(&mut self, index: usize) {
        self.view = View::Task;
        self.task_index = Some(index);
    }

    /// Jump straight to a day, e.g. from a calendar cell
    pub fn open_location(&mut self, loc: &DayLocation) {
        self.open_phase(&loc.phase_id);
        self.open_week(&loc.week_id);
        self.open_day(&loc.day_id);
    }

    /// Enter a side-view, keeping the tree location
    pub fn open_side(&mut self, view: View) {
        if view.is_side_view() {
            self.view = view;
        }
    }

    /// The view the recorded ids describe, ignoring any side-view
    pub fn tree_view(&self) -> View {
        if self.task_index.is_some() {
            View::Task
        } else if self.day_id.is_some() {
            View::Day
        } else if self.week_id.is_some() {
            View::Week
        } else if self.phase_id.is_some() {
            View::Phase
        } else {
            View::Home
        }
    }

    /// Leave a side-view for the last tree location, or step up one level
    /// from a tree view.
    pub fn back(&mut self) {
        if self.view.is_side_view() {
            self.view = self.tree_view();
            return;
        }
        match self.view {
            View::Task => {
                self.task_index = None;
                self.view = View::Day;
            }
            View::Day => {
                self.day_id = None;
                self.view = View::Week;
            }
            View::Week => {
                self.week_id = None;
                self.view = View::Phase;
            }
            _ => self.go_home(),
        }
    }

    /// Look the cursor up. A failed lookup means home.
    pub fn resolve<'a>(&self, doc: &'a Document) -> Focus<'a> {
        self.try_resolve(doc).unwrap_or(Focus::Home)
    }

    fn try_resolve<'a>(&self, doc: &'a Document) -> Option<Focus<'a>> {
        let phase = move || doc.phase(self.phase_id.as_deref()?);
        let week = move || {
            let p = phase()?;
            let w = p.weeks.iter().find(|w| Some(w.id.as_str()) == self.week_id.as_deref())?;
            Some((p, w))
        };
        let day = move || {
            let (p, w) = week()?;
            let d = w.days.iter().find(|d| Some(d.id.as_str()) == self.day_id.as_deref())?;
            Some((p, w, d))
        };
        Some(match self.view {
            View::Home => Focus::Home,
            View::Analytics => Focus::Analytics,
            View::Archive => Focus::Archive,
            View::Phase => Focus::Phase(phase()?),
            View::Week => {
                let (p, w) = week()?;
                Focus::Week(p, w)
            }
            View::Day => {
                let (p, w, d) = day()?;
                Focus::Day(p, w, d)
            }
            View::Task => {
                let (_, _, d) = day()?;
                let index = self.task_index?;
                Focus::Task(d, index, d.tasks.get(index)?)
            }
            View::Materials => Focus::Materials(day()?.2),
        })
    }

    /// After a structural edit, retreat to the nearest ancestor that still
    /// exists. Returns whether the cursor moved.
    pub fn reconcile(&mut self, doc: &Document) -> bool {
        let before = self.clone();

        let phase = self.phase_id.as_deref().and_then(|id| doc.phase(id));
        if phase.is_none() {
            let side = self.view;
            self.go_home();
            if matches!(side, View::Analytics | View::Archive) {
                self.view = side;
            }
            return *self != before;
        }
        let week = phase.and_then(|p| {
            let id = self.week_id.as_deref()?;
            p.weeks.iter().find(|w| w.id == id)
        });
        if week.is_none() {
            self.week_id = None;
            self.day_id = None;
            self.task_index = None;
        }
        let day = week.and_then(|w| {
            let id = self.day_id.as_deref()?;
            w.days.iter().find(|d| d.id == id)
        });
        if day.is_none() {
            self.day_id = None;
            self.task_index = None;
        }
        if let (Some(d), Some(i)) = (day, self.task_index) {
            if i >= d.tasks.len() {
                self.task_index = None;
            }
        }

        self.view = match self.view {
            View::Analytics | View::Archive => self.view,
            View::Materials if self.day_id.is_some() => View::Materials,
            _ => self.tree_view(),
        };
        *self != before
    }

    /// The structural node currently in focus, if any
    pub fn node(&self) -> Option<NodeRef> {
        let phase_id = self.phase_id.clone()?;
        match (self.week_id.clone(), self.day_id.clone()) {
            (Some(week_id), Some(day_id)) => Some(NodeRef::Day {
                phase_id,
                week_id,
                day_id,
            }),
            (Some(week_id), None) => Some(NodeRef::Week { phase_id, week_id }),
            _ => Some(NodeRef::Phase { phase_id }),
        }
    }

    /// The checklist shown in the current tree view: goals on a phase,
    /// objectives on a week, tasks on a day or task.
    pub fn checklist(&self) -> Option<ChecklistRef> {
        let phase_id = self.phase_id.clone()?;
        match self.view {
            View::Phase => Some(ChecklistRef::Goals { phase_id }),
            View::Week => Some(ChecklistRef::Objectives {
                phase_id,
                week_id: self.week_id.clone()?,
            }),
            View::Day | View::Task => Some(ChecklistRef::Tasks {
                phase_id,
                week_id: self.week_id.clone()?,
                day_id: self.day_id.clone()?,
            }),
            _ => None,
        }
    }

    /// Breadcrumb titles from the phase down to the focused node
    pub fn breadcrumb(&self, doc: &Document) -> Vec<String> {
        let mut crumbs = vec!["Home".to_string()];
        match self.resolve(doc) {
            Focus::Home => {}
            Focus::Analytics => crumbs.push("Analytics".into()),
            Focus::Archive => crumbs.push("Archive".into()),
            Focus::Phase(p) => crumbs.push(p.title.clone()),
            Focus::Week(p, w) => crumbs.extend([p.title.clone(), w.title.clone()]),
            Focus::Day(p, w, d) => {
                crumbs.extend([p.title.clone(), w.title.clone(), d.title.clone()])
            }
            Focus::Task(d, _, t) => {
                if let Some((p, w)) = self.phase_and_week(doc) {
                    crumbs.extend([p.title.clone(), w.title.clone()]);
                }
                crumbs.extend([d.title.clone(), t.text.clone()]);
            }
            Focus::Materials(d) => {
                if let Some((p, w)) = self.phase_and_week(doc) {
                    crumbs.extend([p.title.clone(), w.title.clone()]);
                }
                crumbs.extend([d.title.clone(), "Materials".into()]);
            }
        }
        crumbs
    }

    fn phase_and_week<'a>(&self, doc: &'a Document) -> Option<(&'a Phase, &'a Week)> {
        let p = doc.phase(self.phase_id.as_deref()?)?;
        let w = doc.week(&p.id, self.week_id.as_deref()?)?;
        Some((p, w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::ops::tree_ops::{
        add_checklist_item, create_day, create_phase, create_week, delete_checklist_item,
        delete_node,
    };
    use crate::util::clock::IdGenerator;

    struct Fixture {
        doc: Document,
        phase: String,
        week: String,
        day: String,
    }

    fn fixture() -> Fixture {
        let now = Utc.with_ymd_and_hms(2025, 1, 6, 8, 0, 0).unwrap();
        let mut doc = Document::default();
        let mut ids = IdGenerator::new();
        let phase = create_phase(&mut doc, &mut ids, now, "Phase 1").unwrap();
        let week = create_week(&mut doc, &mut ids, now, &phase, "Week 01").unwrap();
        let day = create_day(&mut doc, &mut ids, now, &phase, &week, "Day 01").unwrap();
        let list = ChecklistRef::Tasks {
            phase_id: phase.clone(),
            week_id: week.clone(),
            day_id: day.clone(),
        };
        for t in ["read", "write", "review"] {
            add_checklist_item(&mut doc, &list, t);
        }
        Fixture { doc, phase, week, day }
    }

    fn at_day(f: &Fixture) -> Cursor {
        let mut c = Cursor::home();
        c.open_phase(&f.phase);
        c.open_week(&f.week);
        c.open_day(&f.day);
        c
    }

    #[test]
    fn descending_clears_lower_levels() {
        let f = fixture();
        let mut c = at_day(&f);
        c.open_task(1);
        c.open_phase(&f.phase);
        assert_eq!(c.view, View::Phase);
        assert_eq!(c.week_id, None);
        assert_eq!(c.day_id, None);
        assert_eq!(c.task_index, None);
    }

    #[test]
    fn side_views_keep_location() {
        let f = fixture();
        let mut c = at_day(&f);
        c.open_side(View::Analytics);
        assert_eq!(c.day_id.as_deref(), Some(f.day.as_str()));
        c.open_side(View::Materials);
        assert!(matches!(c.resolve(&f.doc), Focus::Materials(d) if d.id == f.day));
        c.back();
        assert_eq!(c.view, View::Day);
    }

    #[test]
    fn open_side_ignores_tree_views() {
        let mut c = Cursor::home();
        c.open_side(View::Day);
        assert_eq!(c.view, View::Home);
    }

    #[test]
    fn back_steps_up_one_level() {
        let f = fixture();
        let mut c = at_day(&f);
        c.open_task(0);
        c.back();
        assert_eq!(c.view, View::Day);
        c.back();
        assert_eq!(c.view, View::Week);
        c.back();
        assert_eq!(c.view, View::Phase);
        c.back();
        assert_eq!(c, Cursor::home());
    }

    #[test]
    fn stale_cursor_resolves_home() {
        let f = fixture();
        let mut c = at_day(&f);
        c.day_id = Some("gone".into());
        assert!(matches!(c.resolve(&f.doc), Focus::Home));
    }

    #[test]
    fn deleting_focused_day_retreats_to_week() {
        let mut f = fixture();
        let mut c = at_day(&f);
        delete_node(
            &mut f.doc,
            &NodeRef::Day {
                phase_id: f.phase.clone(),
                week_id: f.week.clone(),
                day_id: f.day.clone(),
            },
        );
        assert!(c.reconcile(&f.doc));
        assert_eq!(c.view, View::Week);
        assert_eq!(c.week_id.as_deref(), Some(f.week.as_str()));
        assert_eq!(c.day_id, None);
    }

    #[test]
    fn deleting_phase_goes_home() {
        let mut f = fixture();
        let mut c = at_day(&f);
        c.open_task(2);
        delete_node(&mut f.doc, &NodeRef::Phase { phase_id: f.phase.clone() });
        assert!(c.reconcile(&f.doc));
        assert_eq!(c, Cursor::home());
    }

    #[test]
    fn reconcile_keeps_live_cursor() {
        let f = fixture();
        let mut c = at_day(&f);
        c.open_task(2);
        assert!(!c.reconcile(&f.doc));
        assert_eq!(c.view, View::Task);
    }

    #[test]
    fn task_index_shifts_after_sibling_delete() {
        let mut f = fixture();
        let mut c = at_day(&f);
        c.open_task(1);
        let list = c.checklist().unwrap();
        delete_checklist_item(&mut f.doc, &list, 0);
        c.reconcile(&f.doc);
        // Still index 1, which is now "review" rather than "write".
        match c.resolve(&f.doc) {
            Focus::Task(_, 1, t) => assert_eq!(t.text, "review"),
            other => panic!("unexpected focus {:?}", other),
        }
    }

    #[test]
    fn task_index_past_end_drops_to_day() {
        let mut f = fixture();
        let mut c = at_day(&f);
        c.open_task(2);
        let list = c.checklist().unwrap();
        delete_checklist_item(&mut f.doc, &list, 0);
        assert!(c.reconcile(&f.doc));
        assert_eq!(c.view, View::Day);
    }

    #[test]
    fn checklist_follows_view_level() {
        let f = fixture();
        let mut c = Cursor::home();
        assert_eq!(c.checklist(), None);
        c.open_phase(&f.phase);
        assert!(matches!(c.checklist(), Some(ChecklistRef::Goals { .. })));
        c.open_week(&f.week);
        assert!(matches!(c.checklist(), Some(ChecklistRef::Objectives { .. })));
        c.open_day(&f.day);
        assert!(matches!(c.checklist(), Some(ChecklistRef::Tasks { .. })));
    }

    #[test]
    fn breadcrumb_lists_titles() {
        let f = fixture();
        let mut c = at_day(&f);
        c.open_task(0);
        assert_eq!(
            c.breadcrumb(&f.doc),
            vec!["Home", "Phase 1", "Week 01", "Day 01", "read"]
        );
    }

    #[test]
    fn open_location_sets_all_ids() {
        let f = fixture();
        let mut c = Cursor::home();
        c.open_location(&DayLocation {
            phase_id: f.phase.clone(),
            week_id: f.week.clone(),
            day_id: f.day.clone(),
        });
        assert_eq!(c, at_day(&f));
    }
}
