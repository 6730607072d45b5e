use serde::Serialize;

use crate::model::document::{ChecklistItem, Day, Document, FileAttachment, Phase, Priority, Recurrence, Week};
use crate::ops::attach_ops::{embed_url, extract_video_id};
use crate::ops::calendar::MonthGrid;
use crate::ops::progress::{
    day_complete, day_progress, overall_progress, phase_complete, phase_progress, week_complete,
    week_progress,
};
use crate::ops::timer::format_elapsed;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct NodeJson {
    /// 1-based position among siblings
    pub position: usize,
    pub id: String,
    pub title: String,
    pub progress: u8,
    pub complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_date: Option<String>,
}

#[derive(Serialize)]
pub struct ItemJson {
    pub position: usize,
    pub text: String,
    pub completed: bool,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "not_recurring")]
    pub recurring: Recurrence,
    #[serde(skip_serializing_if = "is_zero")]
    pub time_spent: u64,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

fn not_recurring(r: &Recurrence) -> bool {
    !r.is_recurring()
}

#[derive(Serialize)]
pub struct FileJson {
    pub position: usize,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

#[derive(Serialize, Default)]
pub struct MaterialsJson {
    pub notes: Vec<String>,
    pub videos: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileJson>>,
    pub time_spent: u64,
}

#[derive(Serialize)]
pub struct StatusJson {
    pub view: String,
    pub breadcrumb: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub progress: u8,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeJson>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub checklist: Vec<ItemJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub materials: Option<MaterialsJson>,
}

#[derive(Serialize)]
pub struct TreeJson {
    pub progress: u8,
    pub phases: Vec<PhaseTreeJson>,
}

#[derive(Serialize)]
pub struct PhaseTreeJson {
    #[serde(flatten)]
    pub node: NodeJson,
    pub weeks: Vec<WeekTreeJson>,
}

#[derive(Serialize)]
pub struct WeekTreeJson {
    #[serde(flatten)]
    pub node: NodeJson,
    pub days: Vec<NodeJson>,
}

#[derive(Serialize)]
pub struct ArchivedJson {
    pub id: String,
    pub title: String,
    pub archived_at: String,
}

#[derive(Serialize)]
pub struct TimerJson {
    pub seconds: u64,
    pub display: String,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn phase_json(position: usize, p: &Phase) -> NodeJson {
    NodeJson {
        position,
        id: p.id.clone(),
        title: p.title.clone(),
        progress: phase_progress(p),
        complete: phase_complete(p),
        assigned_date: None,
    }
}

pub fn week_json(position: usize, w: &Week) -> NodeJson {
    NodeJson {
        position,
        id: w.id.clone(),
        title: w.title.clone(),
        progress: week_progress(w),
        complete: week_complete(w),
        assigned_date: None,
    }
}

pub fn day_json(position: usize, d: &Day) -> NodeJson {
    NodeJson {
        position,
        id: d.id.clone(),
        title: d.title.clone(),
        progress: day_progress(d),
        complete: day_complete(d),
        assigned_date: d.assigned_date.clone(),
    }
}

pub fn items_json(items: &[ChecklistItem]) -> Vec<ItemJson> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| ItemJson {
            position: i + 1,
            text: item.text.clone(),
            completed: item.completed,
            priority: item.priority,
            tags: item.tags.clone(),
            due_date: item.due_date.clone(),
            recurring: item.recurring,
            time_spent: item.time_spent,
        })
        .collect()
}

pub fn files_json(files: &[FileAttachment]) -> Vec<FileJson> {
    files
        .iter()
        .enumerate()
        .map(|(i, f)| FileJson {
            position: i + 1,
            name: f.name.clone(),
            mime_type: f.mime_type.clone(),
            size_bytes: f.size_bytes,
        })
        .collect()
}

pub fn tree_json(doc: &Document) -> TreeJson {
    TreeJson {
        progress: overall_progress(doc),
        phases: doc
            .phases
            .iter()
            .enumerate()
            .map(|(i, p)| PhaseTreeJson {
                node: phase_json(i + 1, p),
                weeks: p
                    .weeks
                    .iter()
                    .enumerate()
                    .map(|(j, w)| WeekTreeJson {
                        node: week_json(j + 1, w),
                        days: w.days.iter().enumerate().map(|(k, d)| day_json(k + 1, d)).collect(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

const BAR_WIDTH: usize = 20;

/// `[#######-------------]  35%`
pub fn progress_bar(percent: u8) -> String {
    let filled = (percent as usize * BAR_WIDTH + 50) / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        percent
    )
}

pub fn node_line(node: &NodeJson) -> String {
    let mark = if node.complete { "✓" } else { " " };
    let date = node
        .assigned_date
        .as_deref()
        .map(|d| format!("  ({})", d))
        .unwrap_or_default();
    format!(
        "{:>3}. {} {:<32} {}{}",
        node.position,
        mark,
        node.title,
        progress_bar(node.progress),
        date
    )
}

pub fn item_line(position: usize, item: &ChecklistItem) -> String {
    let mut line = format!(
        "{:>3}. [{}] {}",
        position,
        if item.completed { "x" } else { " " },
        item.text
    );
    if item.priority != Priority::Medium {
        line.push_str(&format!("  !{}", item.priority.as_str()));
    }
    for tag in &item.tags {
        line.push_str(&format!(" #{}", tag));
    }
    if let Some(due) = &item.due_date {
        line.push_str(&format!("  due {}", due));
    }
    if item.recurring.is_recurring() {
        line.push_str(&format!("  every {}", recurrence_word(item.recurring)));
    }
    if item.time_spent > 0 {
        line.push_str(&format!("  {}", format_elapsed(item.time_spent)));
    }
    line
}

fn recurrence_word(r: Recurrence) -> &'static str {
    match r {
        Recurrence::Daily => "day",
        Recurrence::Weekly => "week",
        Recurrence::Monthly => "month",
        Recurrence::None => "never",
    }
}

pub fn print_checklist(heading: &str, items: &[ChecklistItem]) {
    println!("{}:", heading);
    if items.is_empty() {
        println!("  (none)");
    }
    for (i, item) in items.iter().enumerate() {
        println!("{}", item_line(i + 1, item));
    }
}

/// Notes, videos and (for days) links and files, numbered from 1
pub fn print_materials(m: &MaterialsJson) {
    println!("Time: {}", format_elapsed(m.time_spent));
    println!("Notes:");
    for (i, note) in m.notes.iter().enumerate() {
        println!("{:>3}. {}", i + 1, if note.is_empty() { "(empty)" } else { note });
    }
    println!("Videos:");
    for (i, url) in m.videos.iter().enumerate() {
        match extract_video_id(url) {
            Some(id) => println!("{:>3}. {}  -> {}", i + 1, url, embed_url(&id)),
            None => println!("{:>3}. {}", i + 1, url),
        }
    }
    if let Some(links) = &m.links {
        println!("Links:");
        for (i, url) in links.iter().enumerate() {
            println!("{:>3}. {}", i + 1, url);
        }
    }
    if let Some(files) = &m.files {
        println!("Files:");
        for f in files {
            println!("{:>3}. {} ({}, {} bytes)", f.position, f.name, f.mime_type, f.size_bytes);
        }
    }
}

/// Sunday-first month grid; `*` marks a scheduled day, `[]` today
pub fn render_month(grid: &MonthGrid) -> String {
    let mut out = format!("{:^28}\n", grid.title());
    out.push_str(" Su  Mo  Tu  We  Th  Fr  Sa\n");
    let mut col = 0;
    for _ in 0..grid.leading_blanks {
        out.push_str("    ");
        col += 1;
    }
    for cell in &grid.cells {
        let mark = if cell.has_day { '*' } else { ' ' };
        if cell.is_today {
            out.push_str(&format!("[{:>2}]", cell.day));
        } else {
            out.push_str(&format!(" {:>2}{}", cell.day, mark));
        }
        col += 1;
        if col % 7 == 0 {
            out.push('\n');
        }
    }
    if col % 7 != 0 {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn bar_rounds_to_width() {
        assert_eq!(progress_bar(0), "[--------------------]   0%");
        assert_eq!(progress_bar(50), "[##########----------]  50%");
        assert_eq!(progress_bar(100), "[####################] 100%");
    }

    #[test]
    fn item_line_shows_extras() {
        let mut item = ChecklistItem::new("read".into());
        assert_eq!(item_line(1, &item), "  1. [ ] read");
        item.completed = true;
        item.priority = Priority::High;
        item.tags = vec!["deep".into()];
        item.recurring = Recurrence::Weekly;
        assert_eq!(item_line(2, &item), "  2. [x] read  !high #deep  every week");
    }
}
