use crate::model::document::{DEFAULT_TAG_COLOR, Document, Priority, Recurrence, Tag};
use crate::ops::tree_ops::{checklist_mut, parse_date, ChecklistRef};

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Register a tag. No-op on an empty or already registered name.
pub fn create_tag(doc: &mut Document, name: &str, color: Option<&str>) -> bool {
    let name = name.trim().trim_start_matches('#');
    if name.is_empty() || doc.tag(name).is_some() {
        return false;
    }
    doc.tags.push(Tag {
        name: name.to_string(),
        color: color.unwrap_or(DEFAULT_TAG_COLOR).to_string(),
    });
    true
}

/// Remove a tag from the registry. Items that carry the name keep it; tags
/// are labels, and a label with no registry entry simply renders uncolored.
pub fn delete_tag(doc: &mut Document, name: &str) -> bool {
    let before = doc.tags.len();
    doc.tags.retain(|t| t.name != name);
    doc.tags.len() != before
}

pub fn recolor_tag(doc: &mut Document, name: &str, color: &str) -> bool {
    match doc.tags.iter_mut().find(|t| t.name == name) {
        Some(tag) if !color.trim().is_empty() => {
            tag.color = color.trim().to_string();
            true
        }
        _ => false,
    }
}

/// Tag names used by items that are not in the registry
pub fn dangling_tags(doc: &Document) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for phase in &doc.phases {
        let items = phase
            .goals
            .iter()
            .chain(phase.weeks.iter().flat_map(|w| {
                w.objectives
                    .iter()
                    .chain(w.days.iter().flat_map(|d| d.tasks.iter()))
            }));
        for item in items {
            for tag in &item.tags {
                if doc.tag(tag).is_none() && !out.contains(tag) {
                    out.push(tag.clone());
                }
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Per-item fields
// ---------------------------------------------------------------------------

/// Attach a registered tag to an item
pub fn tag_item(doc: &mut Document, list: &ChecklistRef, index: usize, name: &str) -> bool {
    let name = name.trim().trim_start_matches('#');
    if doc.tag(name).is_none() {
        return false;
    }
    match checklist_mut(doc, list).and_then(|items| items.get_mut(index)) {
        Some(item) if !item.tags.iter().any(|t| t == name) => {
            item.tags.push(name.to_string());
            true
        }
        _ => false,
    }
}

pub fn untag_item(doc: &mut Document, list: &ChecklistRef, index: usize, name: &str) -> bool {
    let name = name.trim().trim_start_matches('#');
    match checklist_mut(doc, list).and_then(|items| items.get_mut(index)) {
        Some(item) => {
            let before = item.tags.len();
            item.tags.retain(|t| t != name);
            item.tags.len() != before
        }
        None => false,
    }
}

pub fn set_priority(doc: &mut Document, list: &ChecklistRef, index: usize, priority: Priority) -> bool {
    match checklist_mut(doc, list).and_then(|items| items.get_mut(index)) {
        Some(item) => {
            item.priority = priority;
            true
        }
        None => false,
    }
}

/// Set or clear (`None`) the due date. An invalid date is a no-op.
pub fn set_due_date(doc: &mut Document, list: &ChecklistRef, index: usize, date: Option<&str>) -> bool {
    let due = match date {
        Some(s) => match parse_date(s) {
            Some(d) => Some(d.format("%Y-%m-%d").to_string()),
            None => return false,
        },
        None => None,
    };
    match checklist_mut(doc, list).and_then(|items| items.get_mut(index)) {
        Some(item) => {
            item.due_date = due;
            true
        }
        None => false,
    }
}

pub fn set_recurrence(doc: &mut Document, list: &ChecklistRef, index: usize, recurring: Recurrence) -> bool {
    match checklist_mut(doc, list).and_then(|items| items.get_mut(index)) {
        Some(item) => {
            item.recurring = recurring;
            true
        }
        None => false,
    }
}
