use indexmap::IndexMap;
use serde::Serialize;

use crate::model::document::{ChecklistItem, Document, Priority};
use crate::ops::progress::{day_complete, overall_progress, phase_progress};

/// Counts for one priority level
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PriorityStats {
    pub total: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseStats {
    pub id: String,
    pub title: String,
    pub progress: u8,
    pub tasks: usize,
    pub completed: usize,
}

/// Figures for the analytics side-view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Analytics {
    pub overall_progress: u8,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub total_days: usize,
    pub complete_days: usize,
    /// Seconds on task timers plus day timers
    pub tracked_seconds: u64,
    pub by_priority: IndexMap<Priority, PriorityStats>,
    /// Tag name → number of tasks carrying it, most used first
    pub tag_usage: IndexMap<String, usize>,
    pub phases: Vec<PhaseStats>,
}

pub fn analytics(doc: &Document) -> Analytics {
    let mut out = Analytics {
        overall_progress: overall_progress(doc),
        ..Default::default()
    };
    for p in [Priority::High, Priority::Medium, Priority::Low] {
        out.by_priority.insert(p, PriorityStats::default());
    }

    for phase in &doc.phases {
        let mut phase_tasks = 0;
        let mut phase_done = 0;
        for week in &phase.weeks {
            for day in &week.days {
                out.total_days += 1;
                if day_complete(day) {
                    out.complete_days += 1;
                }
                out.tracked_seconds = out.tracked_seconds.saturating_add(day.time_spent);
                for task in &day.tasks {
                    phase_tasks += 1;
                    if task.completed {
                        phase_done += 1;
                    }
                    count_task(&mut out, task);
                }
            }
        }
        out.total_tasks += phase_tasks;
        out.completed_tasks += phase_done;
        out.phases.push(PhaseStats {
            id: phase.id.clone(),
            title: phase.title.clone(),
            progress: phase_progress(phase),
            tasks: phase_tasks,
            completed: phase_done,
        });
    }

    out.tag_usage.sort_by(|ka, a, kb, b| b.cmp(a).then_with(|| ka.cmp(kb)));
    out
}

fn count_task(out: &mut Analytics, task: &ChecklistItem) {
    out.tracked_seconds = out.tracked_seconds.saturating_add(task.time_spent);
    let stats = out.by_priority.entry(task.priority).or_default();
    stats.total += 1;
    if task.completed {
        stats.completed += 1;
    }
    for tag in &task.tags {
        *out.tag_usage.entry(tag.clone()).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::ops::tree_ops::{
        add_checklist_item, checklist_mut, create_day, create_phase, create_week, ChecklistRef,
    };
    use crate::util::clock::IdGenerator;

    #[test]
    fn counts_tasks_time_and_tags() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut doc = Document::default();
        let mut ids = IdGenerator::new();
        let p = create_phase(&mut doc, &mut ids, now, "P").unwrap();
        let w = create_week(&mut doc, &mut ids, now, &p, "W").unwrap();
        let d = create_day(&mut doc, &mut ids, now, &p, &w, "D").unwrap();
        let list = ChecklistRef::Tasks {
            phase_id: p.clone(),
            week_id: w.clone(),
            day_id: d.clone(),
        };
        for t in ["a", "b", "c"] {
            add_checklist_item(&mut doc, &list, t);
        }
        {
            let items = checklist_mut(&mut doc, &list).unwrap();
            items[0].completed = true;
            items[0].priority = Priority::High;
            items[0].time_spent = 30;
            items[0].tags = vec!["deep".into(), "math".into()];
            items[1].tags = vec!["math".into()];
        }
        doc.phases[0].weeks[0].days[0].time_spent = 70;

        let a = analytics(&doc);
        assert_eq!(a.total_tasks, 3);
        assert_eq!(a.completed_tasks, 1);
        assert_eq!(a.tracked_seconds, 100);
        assert_eq!(a.by_priority[&Priority::High], PriorityStats { total: 1, completed: 1 });
        assert_eq!(a.by_priority[&Priority::Medium].total, 2);
        assert_eq!(a.tag_usage.get_index(0), Some((&"math".to_string(), &2)));
        assert_eq!(a.phases[0].progress, 33);
        assert_eq!(a.overall_progress, 33);
        assert_eq!(a.total_days, 1);
        assert_eq!(a.complete_days, 0);
    }

    #[test]
    fn tracked_time_saturates() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut doc = Document::default();
        let mut ids = IdGenerator::new();
        let p = create_phase(&mut doc, &mut ids, now, "P").unwrap();
        let w = create_week(&mut doc, &mut ids, now, &p, "W").unwrap();
        let d = create_day(&mut doc, &mut ids, now, &p, &w, "D").unwrap();
        let list = ChecklistRef::Tasks {
            phase_id: p,
            week_id: w,
            day_id: d,
        };
        add_checklist_item(&mut doc, &list, "a");
        checklist_mut(&mut doc, &list).unwrap()[0].time_spent = u64::MAX;
        doc.phases[0].weeks[0].days[0].time_spent = 5;

        assert_eq!(analytics(&doc).tracked_seconds, u64::MAX);
    }

    #[test]
    fn empty_document() {
        let a = analytics(&Document::default());
        assert_eq!(a.total_tasks, 0);
        assert_eq!(a.overall_progress, 0);
        assert_eq!(a.by_priority.len(), 3);
    }
}
