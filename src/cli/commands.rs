use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::ops::timer::MAX_PRESET_MINUTES;

#[derive(Parser)]
#[command(name = "stride", about = concat!("stride v", env!("CARGO_PKG_VERSION"), " - phases, weeks, days, done"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use a different data directory
    #[arg(short = 'D', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the focused node: breadcrumb, progress, children and checklist
    Status,
    /// Show the whole plan with progress
    Tree,
    /// Descend into a child by 1-based position or id
    Open(OpenArgs),
    /// Move the cursor without descending
    Go(GoArgs),
    /// Jump to the day assigned to a date
    Jump(JumpArgs),
    /// Add a phase (home), week (in a phase) or day (in a week)
    Add(AddArgs),
    /// Rename the focused node (or edit the focused task)
    Rename(RenameArgs),
    /// Set the focused phase or week subtitle
    Subtitle(SubtitleArgs),
    /// Delete the focused node and everything under it
    Rm,
    /// Assign or clear the focused day's date
    Date(DateArgs),
    /// Work with the focused checklist (goals, objectives or tasks)
    #[command(subcommand)]
    Item(ItemCmd),
    /// Notes on the focused task or day
    #[command(subcommand)]
    Note(NoteCmd),
    /// YouTube videos on the focused task or day
    #[command(subcommand)]
    Video(UrlCmd),
    /// Web links on the focused day
    #[command(subcommand)]
    Link(UrlCmd),
    /// Files on the focused day
    #[command(subcommand)]
    File(FileCmd),
    /// Manage the tag registry
    #[command(subcommand)]
    Tag(TagCmd),
    /// Archive, restore or purge phases
    #[command(subcommand)]
    Archive(ArchiveCmd),
    /// Track time on the focused task or day
    #[command(subcommand)]
    Timer(TimerCmd),
    /// Run a pomodoro countdown
    Pomodoro(PomodoroArgs),
    /// Show a month with scheduled days marked
    Calendar(CalendarArgs),
    /// Show analytics
    Stats,
    /// Set the color theme
    Theme(ThemeArgs),
    /// Write a JSON backup
    Export(ExportArgs),
    /// Replace all data with a JSON backup
    Import(ImportArgs),
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct OpenArgs {
    /// 1-based position (or id) of the child to open
    pub selector: String,
}

#[derive(Args)]
pub struct GoArgs {
    pub target: GoTarget,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum GoTarget {
    Home,
    Back,
    Materials,
    Analytics,
    Archive,
}

#[derive(Args)]
pub struct JumpArgs {
    /// Date (YYYY-MM-DD)
    pub date: String,
}

// ---------------------------------------------------------------------------
// Structure
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Title of the new node
    pub title: String,
}

#[derive(Args)]
pub struct RenameArgs {
    /// New title
    pub title: String,
}

#[derive(Args)]
pub struct SubtitleArgs {
    pub text: String,
}

#[derive(Args)]
pub struct DateArgs {
    /// Date (YYYY-MM-DD)
    #[arg(required_unless_present = "clear")]
    pub date: Option<String>,
    /// Remove the assigned date
    #[arg(long, conflicts_with = "date")]
    pub clear: bool,
}

// ---------------------------------------------------------------------------
// Checklist items
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ItemCmd {
    /// Append an item
    Add { text: String },
    /// Toggle completion of item N
    Toggle { n: usize },
    /// Change the text of item N
    Edit { n: usize, text: String },
    /// Delete item N
    Rm { n: usize },
    /// Move item FROM so it ends up at position TO
    Mv { from: usize, to: usize },
    /// Set priority of item N
    Priority { n: usize, level: PriorityArg },
    /// Set or clear (no date) the due date of item N
    Due { n: usize, date: Option<String> },
    /// Set recurrence of item N
    Repeat { n: usize, every: RecurrenceArg },
    /// Attach a registered tag to item N
    Tag { n: usize, tag: String },
    /// Remove a tag from item N
    Untag { n: usize, tag: String },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PriorityArg {
    Low,
    Medium,
    High,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum RecurrenceArg {
    None,
    Daily,
    Weekly,
    Monthly,
}

// ---------------------------------------------------------------------------
// Materials
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum NoteCmd {
    /// Append a note
    Add { text: Option<String> },
    /// Replace the text of note N
    Edit { n: usize, text: String },
    /// Delete note N
    Rm { n: usize },
}

#[derive(Subcommand)]
pub enum UrlCmd {
    /// Attach a URL
    Add { url: String },
    /// Remove entry N
    Rm { n: usize },
}

#[derive(Subcommand)]
pub enum FileCmd {
    /// Attach a file from disk
    Add {
        path: PathBuf,
        /// MIME type (guessed from the extension otherwise)
        #[arg(long)]
        mime: Option<String>,
    },
    /// Write attached file N back to disk
    Save { n: usize, path: PathBuf },
    /// Delete file N
    Rm { n: usize },
}

// ---------------------------------------------------------------------------
// Tags and archive
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum TagCmd {
    /// List registered tags
    List,
    /// Register a tag
    New {
        name: String,
        #[arg(long)]
        color: Option<String>,
    },
    /// Remove a tag from the registry (items keep the label)
    Rm { name: String },
    /// Change a tag's color
    Color { name: String, color: String },
}

#[derive(Subcommand)]
pub enum ArchiveCmd {
    /// List archived phases
    List,
    /// Archive an active phase by 1-based position or id
    Add { phase: String },
    /// Move an archived phase back into the plan
    Restore { id: String },
    /// Delete an archived phase permanently
    Purge { id: String },
}

// ---------------------------------------------------------------------------
// Timers
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum TimerCmd {
    /// Show time recorded on the focused task or day
    Show,
    /// Run the timer in the foreground, saving every second
    Run {
        /// Stop after this many seconds (runs until interrupted otherwise)
        #[arg(long = "for")]
        seconds: Option<u64>,
        /// Tick interval in milliseconds
        #[arg(long, default_value_t = 1000, hide = true)]
        interval_ms: u64,
    },
}

#[derive(Args)]
pub struct PomodoroArgs {
    /// Preset length in minutes (first configured preset by default)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=MAX_PRESET_MINUTES as i64))]
    pub minutes: Option<u32>,
    /// Stop after this many seconds
    #[arg(long = "for")]
    pub seconds: Option<u64>,
    /// Tick interval in milliseconds
    #[arg(long, default_value_t = 1000, hide = true)]
    pub interval_ms: u64,
}

// ---------------------------------------------------------------------------
// Views and files
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct CalendarArgs {
    /// Month to show (YYYY-MM); the last shown month otherwise
    pub month: Option<String>,
    /// Step forward one month
    #[arg(long, conflicts_with_all = ["month", "prev"])]
    pub next: bool,
    /// Step back one month
    #[arg(long, conflicts_with = "month")]
    pub prev: bool,
}

#[derive(Args)]
pub struct ThemeArgs {
    pub theme: ThemeArg,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ThemeArg {
    Dark,
    Light,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Output file or directory (current directory by default)
    pub path: Option<PathBuf>,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Backup file to load
    pub path: PathBuf,
}
