use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};

use crate::app::App;
use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::state::{self, SessionState};
use crate::io::store::{FileStore, KeyValueStore};
use crate::model::document::{Priority, Recurrence, Theme};
use crate::ops::analytics::Analytics;
use crate::ops::attach_ops::{decode_file, guess_mime_type};
use crate::ops::calendar::shift_month;
use crate::ops::nav::{Focus, View};
use crate::ops::progress::{checklist_progress, day_progress, overall_progress, phase_progress, week_progress};
use crate::ops::tag_ops;
use crate::ops::timer::{format_elapsed, CountdownTick};
use crate::util::clock::SystemClock;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The app plus the per-directory state kept between invocations
struct Session {
    app: App,
    dir: PathBuf,
    state: SessionState,
}

impl Session {
    /// With `hold_lock` the store lock is taken before loading and kept
    /// until the session drops, so the whole command is one transaction.
    fn open(dir: PathBuf, hold_lock: bool) -> Result<Self, Box<dyn std::error::Error>> {
        let config = config_io::read_config(&dir)?;
        let mut store = FileStore::open(&dir, config.storage.quota())?;
        if hold_lock {
            store.lock()?;
        }
        let mut app = App::open(Box::new(store), Box::new(SystemClock), config);
        if let Some(problem) = app.take_load_problem() {
            eprintln!("warning: {}", problem);
        }

        let state = state::read_session(&dir).unwrap_or_default();
        app.restore_cursor(state.cursor.clone());
        app.countdown = state.countdown(app.countdown.preset_minutes());
        Ok(Session { app, dir, state })
    }

    fn close(mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.state.cursor = self.app.cursor.clone();
        state::write_session(&self.dir, &self.state)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let json = cli.json;
    let dir = config_io::resolve_data_dir(cli.data_dir.as_deref());
    let cmd = cli.command.unwrap_or(Commands::Status);
    // Foreground timers lock per tick instead
    let long_running = matches!(cmd, Commands::Timer(TimerCmd::Run { .. }) | Commands::Pomodoro(_));
    let mut session = Session::open(dir, !long_running)?;

    let result = run(&mut session, cmd, json);
    // The cursor is kept even when the command failed
    session.close()?;
    result
}

fn run(session: &mut Session, cmd: Commands, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let app = &mut session.app;
    match cmd {
        // Read commands
        Commands::Status => cmd_status(app, json),
        Commands::Tree => cmd_tree(app, json),
        Commands::Stats => cmd_stats(app, json),
        Commands::Calendar(args) => cmd_calendar(app, &mut session.state, args, json),

        // Navigation
        Commands::Open(args) => cmd_open(app, args, json),
        Commands::Go(args) => cmd_go(app, args, json),
        Commands::Jump(args) => cmd_jump(app, args, json),

        // Structure
        Commands::Add(args) => cmd_add(app, args),
        Commands::Rename(args) => cmd_rename(app, args),
        Commands::Subtitle(args) => cmd_subtitle(app, args),
        Commands::Rm => cmd_rm(app),
        Commands::Date(args) => cmd_date(app, args),
        Commands::Item(cmd) => cmd_item(app, cmd),

        // Materials
        Commands::Note(cmd) => cmd_note(app, cmd),
        Commands::Video(cmd) => cmd_video(app, cmd),
        Commands::Link(cmd) => cmd_link(app, cmd),
        Commands::File(cmd) => cmd_file(app, cmd),

        // Registry, archive, settings
        Commands::Tag(cmd) => cmd_tag(app, cmd, json),
        Commands::Archive(cmd) => cmd_archive(app, cmd, json),
        Commands::Theme(args) => cmd_theme(app, args),

        // Timers
        Commands::Timer(cmd) => cmd_timer(app, cmd, json),
        Commands::Pomodoro(args) => cmd_pomodoro(app, &mut session.state, args, json),

        // Backup
        Commands::Export(args) => cmd_export(app, args),
        Commands::Import(args) => cmd_import(app, args),
    }
}

/// 1-based position from the command line → index
fn index(n: usize) -> Result<usize, Box<dyn std::error::Error>> {
    n.checked_sub(1).ok_or_else(|| "positions start at 1".into())
}

fn report(changed: bool, message: String) {
    if changed {
        println!("{}", message);
    } else {
        println!("no change");
    }
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn build_status(app: &App) -> StatusJson {
    let focus = app.focus();
    let mut status = StatusJson {
        view: view_name(&focus).to_string(),
        breadcrumb: app.breadcrumb(),
        title: None,
        subtitle: None,
        progress: overall_progress(app.doc()),
        children: Vec::new(),
        checklist: Vec::new(),
        materials: None,
    };
    match focus {
        Focus::Home => {
            status.children = app.doc().phases.iter().enumerate().map(|(i, p)| phase_json(i + 1, p)).collect();
        }
        Focus::Phase(p) => {
            status.title = Some(p.title.clone());
            status.subtitle = Some(p.subtitle.clone());
            status.progress = phase_progress(p);
            status.children = p.weeks.iter().enumerate().map(|(i, w)| week_json(i + 1, w)).collect();
            status.checklist = items_json(&p.goals);
        }
        Focus::Week(_, w) => {
            status.title = Some(w.title.clone());
            status.subtitle = Some(w.subtitle.clone());
            status.progress = week_progress(w);
            status.children = w.days.iter().enumerate().map(|(i, d)| day_json(i + 1, d)).collect();
            status.checklist = items_json(&w.objectives);
        }
        Focus::Day(_, _, d) => {
            status.title = Some(d.title.clone());
            status.subtitle = d.assigned_date.clone();
            status.progress = day_progress(d);
            status.checklist = items_json(&d.tasks);
        }
        Focus::Task(_, _, t) => {
            status.title = Some(t.text.clone());
            status.progress = if t.completed { 100 } else { 0 };
            status.materials = Some(MaterialsJson {
                notes: t.notes.clone(),
                videos: t.videos.clone(),
                links: None,
                files: None,
                time_spent: t.time_spent,
            });
        }
        Focus::Materials(d) => {
            status.title = Some(d.title.clone());
            status.progress = day_progress(d);
            status.materials = Some(MaterialsJson {
                notes: d.notes.clone(),
                videos: d.videos.clone(),
                links: Some(d.links.clone()),
                files: Some(files_json(&d.files)),
                time_spent: d.time_spent,
            });
        }
        Focus::Analytics => status.title = Some("Analytics".into()),
        Focus::Archive => {
            status.title = Some("Archive".into());
            status.children = app
                .doc()
                .archive
                .iter()
                .enumerate()
                .map(|(i, e)| phase_json(i + 1, &e.phase))
                .collect();
        }
    }
    status
}

fn view_name(focus: &Focus<'_>) -> &'static str {
    match focus {
        Focus::Home => "home",
        Focus::Phase(_) => "phase",
        Focus::Week(..) => "week",
        Focus::Day(..) => "day",
        Focus::Task(..) => "task",
        Focus::Materials(_) => "materials",
        Focus::Analytics => "analytics",
        Focus::Archive => "archive",
    }
}

fn cmd_status(app: &App, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let status = build_status(app);
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", status.breadcrumb.join(" > "));
    match (&status.title, &status.subtitle) {
        (Some(t), Some(s)) if !s.is_empty() => println!("{} - {}", t, s),
        (Some(t), _) => println!("{}", t),
        _ => println!("Dashboard"),
    }

    match app.focus() {
        Focus::Home => {
            println!("{}", progress_bar(status.progress));
            print_children("Phases", &status.children);
        }
        Focus::Phase(p) => {
            println!("{}", progress_bar(status.progress));
            print_children("Weeks", &status.children);
            print_checklist(&format!("Goals ({}%)", checklist_progress(&p.goals)), &p.goals);
        }
        Focus::Week(_, w) => {
            println!("{}", progress_bar(status.progress));
            print_children("Days", &status.children);
            print_checklist(&format!("Objectives ({}%)", checklist_progress(&w.objectives)), &w.objectives);
        }
        Focus::Day(_, _, d) => {
            println!("{}", progress_bar(status.progress));
            print_checklist("Tasks", &d.tasks);
            println!(
                "Materials: {} notes, {} videos, {} links, {} files, {} tracked",
                d.notes.len(),
                d.videos.len(),
                d.links.len(),
                d.files.len(),
                format_elapsed(d.time_spent)
            );
        }
        Focus::Task(_, i, t) => {
            println!("{}", item_line(i + 1, t));
            if let Some(m) = &status.materials {
                print_materials(m);
            }
        }
        Focus::Materials(_) => {
            if let Some(m) = &status.materials {
                print_materials(m);
            }
        }
        Focus::Analytics => print_stats(&app.analytics()),
        Focus::Archive => print_archive(app),
    }
    Ok(())
}

fn print_children(heading: &str, children: &[NodeJson]) {
    println!("{}:", heading);
    if children.is_empty() {
        println!("  (none)");
    }
    for child in children {
        println!("{}", node_line(child));
    }
}

fn cmd_tree(app: &App, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let tree = tree_json(app.doc());
    if json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
        return Ok(());
    }
    println!("Overall {}", progress_bar(tree.progress));
    for phase in &tree.phases {
        println!("{}", node_line(&phase.node));
        for week in &phase.weeks {
            println!("     {}", node_line(&week.node));
            for day in &week.days {
                println!("          {}", node_line(day));
            }
        }
    }
    Ok(())
}

fn print_stats(stats: &Analytics) {
    println!("Overall        {}", progress_bar(stats.overall_progress));
    println!("Tasks          {}/{} done", stats.completed_tasks, stats.total_tasks);
    println!("Days complete  {}/{}", stats.complete_days, stats.total_days);
    println!("Time tracked   {}", format_elapsed(stats.tracked_seconds));
    let priorities: Vec<String> = stats
        .by_priority
        .iter()
        .map(|(p, s)| format!("{} {}/{}", p.as_str(), s.completed, s.total))
        .collect();
    println!("Priority       {}", priorities.join("  "));
    if !stats.tag_usage.is_empty() {
        let tags: Vec<String> = stats.tag_usage.iter().map(|(t, n)| format!("#{} {}", t, n)).collect();
        println!("Tags           {}", tags.join(", "));
    }
    if !stats.phases.is_empty() {
        println!("Phases:");
        for p in &stats.phases {
            println!(
                "  {:<32} {}  {}/{} tasks",
                p.title,
                progress_bar(p.progress),
                p.completed,
                p.tasks
            );
        }
    }
}

fn cmd_stats(app: &App, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let stats = app.analytics();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats(&stats);
    }
    Ok(())
}

fn parse_month(s: &str) -> Option<(i32, u32)> {
    let date = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d").ok()?;
    Some((date.year(), date.month()))
}

fn cmd_calendar(
    app: &App,
    state: &mut SessionState,
    args: CalendarArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let today = app.today();
    let (mut year, mut month) = match &args.month {
        Some(m) => parse_month(m).ok_or_else(|| format!("invalid month '{}', expected YYYY-MM", m))?,
        None => state
            .calendar_month
            .as_deref()
            .and_then(parse_month)
            .unwrap_or((today.year(), today.month())),
    };
    if args.next {
        (year, month) = shift_month(year, month, 1);
    } else if args.prev {
        (year, month) = shift_month(year, month, -1);
    }
    state.calendar_month = Some(format!("{:04}-{:02}", year, month));

    let grid = app.month_grid(year, month).ok_or("invalid month")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&grid)?);
    } else {
        print!("{}", render_month(&grid));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

fn cmd_open(app: &mut App, args: OpenArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !app.open_child(&args.selector) {
        return Err(format!("nothing to open at '{}'", args.selector).into());
    }
    cmd_status(app, json)
}

fn cmd_go(app: &mut App, args: GoArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    match args.target {
        GoTarget::Home => app.go_home(),
        GoTarget::Back => app.back(),
        GoTarget::Materials => {
            if !app.open_side(View::Materials) {
                return Err("materials belong to a day; open one first".into());
            }
        }
        GoTarget::Analytics => {
            app.open_side(View::Analytics);
        }
        GoTarget::Archive => {
            app.open_side(View::Archive);
        }
    }
    cmd_status(app, json)
}

fn cmd_jump(app: &mut App, args: JumpArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !app.open_date(&args.date) {
        return Err(format!("no day is assigned to {}", args.date).into());
    }
    cmd_status(app, json)
}

// ---------------------------------------------------------------------------
// Structure
// ---------------------------------------------------------------------------

fn cmd_add(app: &mut App, args: AddArgs) -> Result<(), Box<dyn std::error::Error>> {
    match app.add_child(&args.title)? {
        Some(id) => println!("{}", id),
        None => println!("no change"),
    }
    Ok(())
}

fn cmd_rename(app: &mut App, args: RenameArgs) -> Result<(), Box<dyn std::error::Error>> {
    let changed = app.rename(&args.title)?;
    report(changed, format!("renamed to {}", args.title.trim()));
    Ok(())
}

fn cmd_subtitle(app: &mut App, args: SubtitleArgs) -> Result<(), Box<dyn std::error::Error>> {
    let changed = app.set_subtitle(&args.text)?;
    report(changed, "subtitle updated".into());
    Ok(())
}

fn cmd_rm(app: &mut App) -> Result<(), Box<dyn std::error::Error>> {
    let crumbs = app.breadcrumb();
    let changed = app.delete_focused()?;
    report(changed, format!("deleted {}", crumbs.last().cloned().unwrap_or_default()));
    Ok(())
}

fn cmd_date(app: &mut App, args: DateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let date = if args.clear { None } else { args.date.as_deref() };
    let changed = app.set_date(date)?;
    report(
        changed,
        match date {
            Some(d) => format!("assigned {}", d),
            None => "date cleared".into(),
        },
    );
    Ok(())
}

fn priority(arg: PriorityArg) -> Priority {
    match arg {
        PriorityArg::Low => Priority::Low,
        PriorityArg::Medium => Priority::Medium,
        PriorityArg::High => Priority::High,
    }
}

fn recurrence(arg: RecurrenceArg) -> Recurrence {
    match arg {
        RecurrenceArg::None => Recurrence::None,
        RecurrenceArg::Daily => Recurrence::Daily,
        RecurrenceArg::Weekly => Recurrence::Weekly,
        RecurrenceArg::Monthly => Recurrence::Monthly,
    }
}

fn cmd_item(app: &mut App, cmd: ItemCmd) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ItemCmd::Add { text } => {
            let changed = app.add_item(&text)?;
            report(changed, format!("added {}", text.trim()));
        }
        ItemCmd::Toggle { n } => match app.toggle_item(index(n)?)? {
            Some(true) => println!("item {} done", n),
            Some(false) => println!("item {} reopened", n),
            None => println!("no change"),
        },
        ItemCmd::Edit { n, text } => {
            let changed = app.edit_item(index(n)?, &text)?;
            report(changed, format!("item {} updated", n));
        }
        ItemCmd::Rm { n } => {
            let changed = app.delete_item(index(n)?)?;
            report(changed, format!("item {} deleted", n));
        }
        ItemCmd::Mv { from, to } => {
            let changed = app.reorder_item(index(from)?, index(to)?)?;
            report(changed, format!("item {} moved to {}", from, to));
        }
        ItemCmd::Priority { n, level } => {
            let p = priority(level);
            let changed = app.set_priority(index(n)?, p)?;
            report(changed, format!("item {} priority {}", n, p.as_str()));
        }
        ItemCmd::Due { n, date } => {
            let changed = app.set_due_date(index(n)?, date.as_deref())?;
            report(
                changed,
                match date {
                    Some(d) => format!("item {} due {}", n, d),
                    None => format!("item {} due date cleared", n),
                },
            );
        }
        ItemCmd::Repeat { n, every } => {
            let changed = app.set_recurrence(index(n)?, recurrence(every))?;
            report(changed, format!("item {} recurrence updated", n));
        }
        ItemCmd::Tag { n, tag } => {
            let changed = app.tag_item(index(n)?, &tag)?;
            if !changed && app.doc().tag(tag.trim().trim_start_matches('#')).is_none() {
                return Err(format!("unknown tag '{}'; register it with `stride tag new`", tag).into());
            }
            report(changed, format!("item {} tagged #{}", n, tag.trim_start_matches('#')));
        }
        ItemCmd::Untag { n, tag } => {
            let changed = app.untag_item(index(n)?, &tag)?;
            report(changed, format!("item {} untagged #{}", n, tag.trim_start_matches('#')));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Materials
// ---------------------------------------------------------------------------

fn cmd_note(app: &mut App, cmd: NoteCmd) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        NoteCmd::Add { text } => {
            let i = app.add_note(text.as_deref())?;
            println!("note {} added", i + 1);
        }
        NoteCmd::Edit { n, text } => {
            app.edit_note(index(n)?, &text)?;
            println!("note {} updated", n);
        }
        NoteCmd::Rm { n } => {
            app.delete_note(index(n)?)?;
            println!("note {} deleted", n);
        }
    }
    Ok(())
}

fn cmd_video(app: &mut App, cmd: UrlCmd) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        UrlCmd::Add { url } => {
            app.add_video(&url)?;
            println!("video added");
        }
        UrlCmd::Rm { n } => {
            let url = app.delete_video(index(n)?)?;
            println!("removed {}", url);
        }
    }
    Ok(())
}

fn cmd_link(app: &mut App, cmd: UrlCmd) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        UrlCmd::Add { url } => {
            app.add_link(&url)?;
            println!("link added");
        }
        UrlCmd::Rm { n } => {
            let url = app.delete_link(index(n)?)?;
            println!("removed {}", url);
        }
    }
    Ok(())
}

fn cmd_file(app: &mut App, cmd: FileCmd) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        FileCmd::Add { path, mime } => {
            let content = fs::read(&path).map_err(|e| format!("could not read {}: {}", path.display(), e))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| format!("not a file: {}", path.display()))?;
            let mime = mime.unwrap_or_else(|| guess_mime_type(&path).to_string());
            app.attach_file(&name, &mime, &content)?;
            println!("attached {} ({} bytes)", name, content.len());
        }
        FileCmd::Save { n, path } => {
            let i = index(n)?;
            let file = match app.focus() {
                Focus::Day(_, _, d) | Focus::Materials(d) => d.files.get(i).cloned(),
                _ => return Err("files belong to a day; open one first".into()),
            }
            .ok_or_else(|| format!("no file {}", n))?;
            let bytes = decode_file(&file).ok_or_else(|| format!("file {} has unreadable data", n))?;
            let out = if path.is_dir() { path.join(&file.name) } else { path };
            fs::write(&out, bytes)?;
            println!("wrote {}", out.display());
        }
        FileCmd::Rm { n } => {
            let file = app.delete_file(index(n)?)?;
            println!("removed {}", file.name);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Registry, archive, settings
// ---------------------------------------------------------------------------

fn cmd_tag(app: &mut App, cmd: TagCmd, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        TagCmd::List => {
            let dangling = tag_ops::dangling_tags(app.doc());
            if json {
                println!("{}", serde_json::to_string_pretty(&app.doc().tags)?);
                return Ok(());
            }
            for tag in &app.doc().tags {
                println!("#{:<20} {}", tag.name, tag.color);
            }
            if !dangling.is_empty() {
                println!("unregistered: {}", dangling.join(", "));
            }
        }
        TagCmd::New { name, color } => {
            let changed = app.create_tag(&name, color.as_deref())?;
            report(changed, format!("tag #{} created", name.trim().trim_start_matches('#')));
        }
        TagCmd::Rm { name } => {
            let changed = app.delete_tag(&name)?;
            report(changed, format!("tag #{} removed", name));
        }
        TagCmd::Color { name, color } => {
            let changed = app.recolor_tag(&name, &color)?;
            report(changed, format!("tag #{} is now {}", name, color));
        }
    }
    Ok(())
}

fn print_archive(app: &App) {
    if app.doc().archive.is_empty() {
        println!("archive is empty");
    }
    for entry in &app.doc().archive {
        println!("{}  {:<32} archived {}", entry.phase.id, entry.phase.title, entry.archived_at);
    }
}

fn cmd_archive(app: &mut App, cmd: ArchiveCmd, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ArchiveCmd::List => {
            if json {
                let list: Vec<ArchivedJson> = app
                    .doc()
                    .archive
                    .iter()
                    .map(|e| ArchivedJson {
                        id: e.phase.id.clone(),
                        title: e.phase.title.clone(),
                        archived_at: e.archived_at.clone(),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else {
                print_archive(app);
            }
        }
        ArchiveCmd::Add { phase } => {
            app.archive_phase(&phase)?;
            println!("archived");
        }
        ArchiveCmd::Restore { id } => {
            app.restore_phase(&id)?;
            println!("restored {}", id);
        }
        ArchiveCmd::Purge { id } => {
            app.purge_archived(&id)?;
            println!("purged {}", id);
        }
    }
    Ok(())
}

fn cmd_theme(app: &mut App, args: ThemeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let theme = match args.theme {
        ThemeArg::Dark => Theme::Dark,
        ThemeArg::Light => Theme::Light,
    };
    let changed = app.set_theme(theme)?;
    report(changed, "theme updated".into());
    Ok(())
}

// ---------------------------------------------------------------------------
// Timers
// ---------------------------------------------------------------------------

fn cmd_timer(app: &mut App, cmd: TimerCmd, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (seconds, interval_ms) = match cmd {
        TimerCmd::Show => {
            let secs = app.time_spent().ok_or("open a day or task to see its time")?;
            print_timer(secs, json)?;
            return Ok(());
        }
        TimerCmd::Run { seconds, interval_ms } => (seconds, interval_ms),
    };

    app.start_timer()?;
    let interval = Duration::from_millis(interval_ms);
    let mut remaining = seconds.unwrap_or(u64::MAX);
    while remaining > 0 {
        thread::sleep(interval);
        let tick = app.tick()?;
        if tick.target_lost {
            eprintln!("timer target no longer exists; stopped");
            break;
        }
        if !json {
            if let Some(secs) = tick.elapsed {
                print!("\r{}", format_elapsed(secs));
                std::io::stdout().flush()?;
            }
        }
        remaining -= 1;
    }
    app.pause_timer();
    if !json {
        println!();
    }
    print_timer(app.time_spent().unwrap_or(0), json)
}

fn print_timer(seconds: u64, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let display = format_elapsed(seconds);
    if json {
        println!("{}", serde_json::to_string_pretty(&TimerJson { seconds, display })?);
    } else {
        println!("{} tracked", display);
    }
    Ok(())
}

fn cmd_pomodoro(
    app: &mut App,
    state: &mut SessionState,
    args: PomodoroArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(minutes) = args.minutes {
        app.countdown.set_preset(minutes);
        state.pomodoro_minutes = Some(minutes);
    }
    app.countdown.reset();
    app.countdown.start();

    let interval = Duration::from_millis(args.interval_ms);
    let mut remaining = args.seconds.unwrap_or(u64::MAX);
    while remaining > 0 {
        thread::sleep(interval);
        match app.tick()?.countdown {
            CountdownTick::Finished => {
                if !json {
                    println!("\r00:00\x07");
                    println!("pomodoro finished");
                }
                break;
            }
            CountdownTick::Running { .. } if !json => {
                print!("\r{}", app.countdown.display());
                std::io::stdout().flush()?;
            }
            _ => {}
        }
        remaining -= 1;
    }
    app.countdown.pause();
    if json {
        println!("{}", serde_json::to_string_pretty(&app.countdown)?);
    } else if app.countdown.remaining() > 0 {
        println!("\rpaused at {}", app.countdown.display());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Backup
// ---------------------------------------------------------------------------

fn cmd_export(app: &mut App, args: ExportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (name, text) = app.export()?;
    let out = match args.path {
        Some(p) if p.is_dir() => p.join(name),
        Some(p) => p,
        None => PathBuf::from(name),
    };
    fs::write(&out, text)?;
    println!("{}", out.display());
    Ok(())
}

fn cmd_import(app: &mut App, args: ImportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let text = fs::read_to_string(&args.path)
        .map_err(|e| format!("could not read {}: {}", args.path.display(), e))?;
    app.import(&text)?;
    println!("imported {} phases", app.doc().phases.len());
    Ok(())
}
