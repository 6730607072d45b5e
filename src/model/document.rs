use serde::{Deserialize, Serialize};

/// Schema version written by this build
pub const CURRENT_SCHEMA_VERSION: u32 = 3;

/// The whole persisted plan. One per store; the unit of serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub schema_version: u32,
    pub phases: Vec<Phase>,
    pub settings: Settings,
    /// Global tag registry, keyed by `name`
    pub tags: Vec<Tag>,
    /// Phases moved out of the active plan
    pub archive: Vec<ArchiveEntry>,
}

impl Default for Document {
    fn default() -> Self {
        Document {
            schema_version: CURRENT_SCHEMA_VERSION,
            phases: Vec::new(),
            settings: Settings::default(),
            tags: Vec::new(),
            archive: Vec::new(),
        }
    }
}

impl Document {
    pub fn phase(&self, phase_id: &str) -> Option<&Phase> {
        self.phases.iter().find(|p| p.id == phase_id)
    }

    pub fn phase_mut(&mut self, phase_id: &str) -> Option<&mut Phase> {
        self.phases.iter_mut().find(|p| p.id == phase_id)
    }

    pub fn week(&self, phase_id: &str, week_id: &str) -> Option<&Week> {
        self.phase(phase_id)?.weeks.iter().find(|w| w.id == week_id)
    }

    pub fn week_mut(&mut self, phase_id: &str, week_id: &str) -> Option<&mut Week> {
        self.phase_mut(phase_id)?
            .weeks
            .iter_mut()
            .find(|w| w.id == week_id)
    }

    pub fn day(&self, phase_id: &str, week_id: &str, day_id: &str) -> Option<&Day> {
        self.week(phase_id, week_id)?
            .days
            .iter()
            .find(|d| d.id == day_id)
    }

    pub fn day_mut(&mut self, phase_id: &str, week_id: &str, day_id: &str) -> Option<&mut Day> {
        self.week_mut(phase_id, week_id)?
            .days
            .iter_mut()
            .find(|d| d.id == day_id)
    }

    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name == name)
    }
}

/// Display theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub theme: Theme,
    /// RFC 3339 timestamp of the last save
    pub last_activity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub goals: Vec<ChecklistItem>,
    pub weeks: Vec<Week>,
}

impl Phase {
    pub fn new(id: String, title: String) -> Self {
        Phase {
            id,
            title,
            subtitle: "New Phase".to_string(),
            goals: Vec::new(),
            weeks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Week {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub objectives: Vec<ChecklistItem>,
    pub days: Vec<Day>,
}

impl Week {
    pub fn new(id: String, title: String) -> Self {
        Week {
            id,
            title,
            subtitle: "New Week".to_string(),
            objectives: Vec::new(),
            days: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Day {
    pub id: String,
    pub title: String,
    /// Calendar date `YYYY-MM-DD`
    pub assigned_date: Option<String>,
    pub tasks: Vec<ChecklistItem>,
    pub notes: Vec<String>,
    pub videos: Vec<String>,
    pub files: Vec<FileAttachment>,
    pub links: Vec<String>,
    /// Seconds tracked by the day timer
    pub time_spent: u64,
}

impl Day {
    pub fn new(id: String, title: String) -> Self {
        Day {
            id,
            title,
            assigned_date: None,
            tasks: Vec::new(),
            notes: Vec::new(),
            videos: Vec::new(),
            files: Vec::new(),
            links: Vec::new(),
            time_spent: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn parse_priority(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl Recurrence {
    pub fn parse_recurrence(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Recurrence::None),
            "daily" => Some(Recurrence::Daily),
            "weekly" => Some(Recurrence::Weekly),
            "monthly" => Some(Recurrence::Monthly),
            _ => None,
        }
    }

    pub fn is_recurring(self) -> bool {
        self != Recurrence::None
    }
}

/// A completable entry: a goal (phase), objective (week) or task (day).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub text: String,
    pub completed: bool,
    pub priority: Priority,
    /// Tag names; weak references into `Document::tags`
    pub tags: Vec<String>,
    pub time_spent: u64,
    pub due_date: Option<String>,
    pub recurring: Recurrence,
    pub last_completed: Option<String>,
    pub notes: Vec<String>,
    pub videos: Vec<String>,
}

impl ChecklistItem {
    pub fn new(text: String) -> Self {
        ChecklistItem {
            text,
            completed: false,
            priority: Priority::Medium,
            tags: Vec::new(),
            time_spent: 0,
            due_date: None,
            recurring: Recurrence::None,
            last_completed: None,
            notes: Vec::new(),
            videos: Vec::new(),
        }
    }
}

/// A small file stored inline as a data URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAttachment {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    /// `data:<mime>;base64,<payload>`
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub color: String,
}

/// Default color for tags created without one
pub const DEFAULT_TAG_COLOR: &str = "#6c757d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    pub phase: Phase,
    pub archived_at: String,
}
