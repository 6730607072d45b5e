//! Completion percentages, derived on every query.
//!
//! Each level rounds independently and averages its children without
//! weighting: a phase with one week counts as much toward the overall figure
//! as a phase with ten. Empty collections report 0.

use crate::model::document::{ChecklistItem, Day, Document, Phase, Week};

/// Round-half-up of `num / den` for non-negative values. `den` must be > 0.
fn round_div(num: u64, den: u64) -> u8 {
    ((2 * num + den) / (2 * den)) as u8
}

fn mean(values: impl Iterator<Item = u8>) -> u8 {
    let mut total = 0u64;
    let mut count = 0u64;
    for v in values {
        total += u64::from(v);
        count += 1;
    }
    if count == 0 {
        0
    } else {
        round_div(total, count)
    }
}

/// Percentage of completed items in a checklist (goals, objectives, tasks),
/// rounded half up. A nearly finished list can round to 100; use
/// [`day_complete`] to ask whether everything is done.
pub fn checklist_progress(items: &[ChecklistItem]) -> u8 {
    if items.is_empty() {
        return 0;
    }
    let done = items.iter().filter(|i| i.completed).count() as u64;
    let total = items.len() as u64;
    round_div(100 * done, total)
}

pub fn day_progress(day: &Day) -> u8 {
    checklist_progress(&day.tasks)
}

pub fn week_progress(week: &Week) -> u8 {
    mean(week.days.iter().map(day_progress))
}

pub fn phase_progress(phase: &Phase) -> u8 {
    mean(phase.weeks.iter().map(week_progress))
}

pub fn overall_progress(doc: &Document) -> u8 {
    mean(doc.phases.iter().map(phase_progress))
}

/// A day is complete when it has tasks and every one is done
pub fn day_complete(day: &Day) -> bool {
    !day.tasks.is_empty() && day.tasks.iter().all(|t| t.completed)
}

pub fn week_complete(week: &Week) -> bool {
    !week.days.is_empty() && week.days.iter().all(day_complete)
}

pub fn phase_complete(phase: &Phase) -> bool {
    !phase.weeks.is_empty() && phase.weeks.iter().all(week_complete)
}
