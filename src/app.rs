//! Application state: the document, the cursor and everything that acts on
//! them. Every user action is a method here; each one that changes the
//! document persists it before returning.

use chrono::NaiveDate;
use indexmap::IndexMap;

use crate::io::gateway::{self, Gateway, LoadProblem};
use crate::io::store::{KeyValueStore, StoreError};
use crate::model::config::AppConfig;
use crate::model::document::{Document, FileAttachment, Priority, Recurrence, Theme};
use crate::ops::analytics::{self, Analytics};
use crate::ops::archive_ops::{self, ArchiveError};
use crate::ops::attach_ops::{self, AttachError, AttachTarget};
use crate::ops::calendar::{self, DayLocation, MonthGrid};
use crate::ops::migrate::MigrateError;
use crate::ops::nav::{Cursor, Focus, View};
use crate::ops::tag_ops;
use crate::ops::timer::{Countdown, CountdownTick, ElapsedTimer};
use crate::ops::tree_ops::{self, NodeRef};
use crate::util::clock::{Clock, IdGenerator};

/// Error type for application actions
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Attach(#[from] AttachError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("import failed: {0}")]
    Import(#[from] MigrateError),
    #[error("export failed: {0}")]
    Export(#[from] serde_json::Error),
    #[error("{0}")]
    NoTarget(&'static str),
}

/// What one timer tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Accumulated seconds on the timer target, if the timer is running
    pub elapsed: Option<u64>,
    /// The target vanished and the timer was stopped
    pub target_lost: bool,
    pub countdown: CountdownTick,
}

pub struct App {
    doc: Document,
    pub cursor: Cursor,
    gateway: Gateway,
    clock: Box<dyn Clock>,
    ids: IdGenerator,
    config: AppConfig,
    timer: ElapsedTimer,
    timer_target: Option<AttachTarget>,
    pub countdown: Countdown,
    load_problem: Option<LoadProblem>,
}

impl App {
    /// Hydrate from `store`. A fresh store starts with the configured theme.
    pub fn open(store: Box<dyn KeyValueStore>, clock: Box<dyn Clock>, config: AppConfig) -> Self {
        let mut gateway = Gateway::new(store);
        let loaded = gateway.load();
        let mut doc = loaded.document;
        if loaded.source.is_none() {
            doc.settings.theme = config.ui.theme;
        }
        let preset = config.timer.pomodoro_presets.first().copied().unwrap_or(25);
        App {
            doc,
            cursor: Cursor::home(),
            gateway,
            clock,
            ids: IdGenerator::new(),
            config,
            timer: ElapsedTimer::new(),
            timer_target: None,
            countdown: Countdown::new(preset),
            load_problem: loaded.problem,
        }
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// The problem hit while loading, reported once
    pub fn take_load_problem(&mut self) -> Option<LoadProblem> {
        self.load_problem.take()
    }

    pub fn take_render_request(&mut self) -> bool {
        self.gateway.take_render_request()
    }

    fn commit(&mut self) -> Result<(), AppError> {
        let now = self.clock.now();
        self.gateway.save(&mut self.doc, now)?;
        Ok(())
    }

    fn commit_if(&mut self, changed: bool) -> Result<bool, AppError> {
        if changed {
            self.commit()?;
        }
        Ok(changed)
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    pub fn focus(&self) -> Focus<'_> {
        self.cursor.resolve(&self.doc)
    }

    pub fn breadcrumb(&self) -> Vec<String> {
        self.cursor.breadcrumb(&self.doc)
    }

    /// Replace the cursor (e.g. one restored from disk) and pull it back
    /// onto the tree
    pub fn restore_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
        self.cursor.reconcile(&self.doc);
    }

    /// Descend one level. `selector` is a 1-based position or an id; tasks
    /// are selected by position only.
    pub fn open_child(&mut self, selector: &str) -> bool {
        match self.focus() {
            Focus::Home => {
                let Some(id) = pick(&self.doc.phases, selector, |p| &p.id) else {
                    return false;
                };
                self.cursor.open_phase(&id);
            }
            Focus::Phase(p) => {
                let Some(id) = pick(&p.weeks, selector, |w| &w.id) else {
                    return false;
                };
                self.cursor.open_week(&id);
            }
            Focus::Week(_, w) => {
                let Some(id) = pick(&w.days, selector, |d| &d.id) else {
                    return false;
                };
                self.cursor.open_day(&id);
            }
            Focus::Day(_, _, d) => match position(selector, d.tasks.len()) {
                Some(index) => self.cursor.open_task(index),
                None => return false,
            },
            _ => return false,
        }
        true
    }

    pub fn go_home(&mut self) {
        self.cursor.go_home();
    }

    pub fn back(&mut self) {
        self.cursor.back();
    }

    /// Materials need a day in focus; analytics and archive are always open
    pub fn open_side(&mut self, view: View) -> bool {
        if view == View::Materials && self.cursor.day_id.is_none() {
            return false;
        }
        self.cursor.open_side(view);
        true
    }

    /// Jump to the day assigned to `date`
    pub fn open_date(&mut self, date: &str) -> bool {
        let Some(date) = tree_ops::parse_date(date) else {
            return false;
        };
        let index = calendar::date_index(&self.doc);
        match index.get(&date.format("%Y-%m-%d").to_string()) {
            Some(loc) => {
                self.cursor.open_location(loc);
                true
            }
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------------

    /// Create a child of the focused node: a phase from home, a week in a
    /// phase, a day in a week. Returns the new id.
    pub fn add_child(&mut self, title: &str) -> Result<Option<String>, AppError> {
        let now = self.clock.now();
        let c = &self.cursor;
        let id = match (c.view, &c.phase_id, &c.week_id) {
            (View::Home, _, _) => tree_ops::create_phase(&mut self.doc, &mut self.ids, now, title),
            (View::Phase, Some(p), _) => {
                tree_ops::create_week(&mut self.doc, &mut self.ids, now, p, title)
            }
            (View::Week, Some(p), Some(w)) => {
                tree_ops::create_day(&mut self.doc, &mut self.ids, now, p, w, title)
            }
            _ => return Err(AppError::NoTarget("nothing to add here; add items with `item add`")),
        };
        self.commit_if(id.is_some())?;
        Ok(id)
    }

    /// Rename the focused node, or edit the focused task's text
    pub fn rename(&mut self, title: &str) -> Result<bool, AppError> {
        let changed = if self.cursor.view == View::Task {
            let (Some(list), Some(index)) = (self.cursor.checklist(), self.cursor.task_index) else {
                return Ok(false);
            };
            tree_ops::edit_checklist_item(&mut self.doc, &list, index, title)
        } else {
            let node = self.focused_node()?;
            tree_ops::rename_node(&mut self.doc, &node, title)
        };
        self.commit_if(changed)
    }

    pub fn set_subtitle(&mut self, text: &str) -> Result<bool, AppError> {
        let node = self.focused_node()?;
        let changed = tree_ops::set_subtitle(&mut self.doc, &node, text);
        self.commit_if(changed)
    }

    /// Assign or clear (`None`) the focused day's date
    pub fn set_date(&mut self, date: Option<&str>) -> Result<bool, AppError> {
        let Some(NodeRef::Day {
            phase_id,
            week_id,
            day_id,
        }) = self.cursor.node().filter(|n| matches!(n, NodeRef::Day { .. }))
        else {
            return Err(AppError::NoTarget("dates can only be assigned to a day"));
        };
        let changed = match date {
            Some(d) => tree_ops::assign_date(&mut self.doc, &phase_id, &week_id, &day_id, d),
            None => tree_ops::clear_date(&mut self.doc, &phase_id, &week_id, &day_id),
        };
        self.commit_if(changed)
    }

    /// Delete the focused node with everything under it; the cursor
    /// retreats to the parent
    pub fn delete_focused(&mut self) -> Result<bool, AppError> {
        let node = self.focused_node()?;
        self.delete_node(&node)
    }

    pub fn delete_node(&mut self, node: &NodeRef) -> Result<bool, AppError> {
        let changed = tree_ops::delete_node(&mut self.doc, node);
        if changed {
            tracing::info!(kind = node.kind(), "deleted node");
            self.cursor.reconcile(&self.doc);
        }
        self.commit_if(changed)
    }

    fn focused_node(&self) -> Result<NodeRef, AppError> {
        if self.cursor.view.is_side_view() && self.cursor.view != View::Materials {
            return Err(AppError::NoTarget("no node in focus"));
        }
        self.cursor
            .node()
            .ok_or(AppError::NoTarget("no node in focus; open a phase first"))
    }

    // -----------------------------------------------------------------------
    // Checklists
    // -----------------------------------------------------------------------

    fn focused_list(&self) -> Result<tree_ops::ChecklistRef, AppError> {
        self.cursor
            .checklist()
            .ok_or(AppError::NoTarget("no checklist in focus; open a phase, week or day"))
    }

    pub fn add_item(&mut self, text: &str) -> Result<bool, AppError> {
        let list = self.focused_list()?;
        let changed = tree_ops::add_checklist_item(&mut self.doc, &list, text);
        self.commit_if(changed)
    }

    /// Flip completion; returns the new state
    pub fn toggle_item(&mut self, index: usize) -> Result<Option<bool>, AppError> {
        let list = self.focused_list()?;
        let now = self.clock.now();
        let state = tree_ops::toggle_completion(&mut self.doc, &list, index, now);
        self.commit_if(state.is_some())?;
        Ok(state)
    }

    pub fn edit_item(&mut self, index: usize, text: &str) -> Result<bool, AppError> {
        let list = self.focused_list()?;
        let changed = tree_ops::edit_checklist_item(&mut self.doc, &list, index, text);
        self.commit_if(changed)
    }

    pub fn delete_item(&mut self, index: usize) -> Result<bool, AppError> {
        let list = self.focused_list()?;
        let changed = tree_ops::delete_checklist_item(&mut self.doc, &list, index);
        if changed {
            self.cursor.reconcile(&self.doc);
        }
        self.commit_if(changed)
    }

    /// Move the item at `from` so it ends up at index `to`
    pub fn reorder_item(&mut self, from: usize, to: usize) -> Result<bool, AppError> {
        let list = self.focused_list()?;
        let changed = tree_ops::reorder_task(&mut self.doc, &list, from, to);
        self.commit_if(changed)
    }

    pub fn set_priority(&mut self, index: usize, priority: Priority) -> Result<bool, AppError> {
        let list = self.focused_list()?;
        let changed = tag_ops::set_priority(&mut self.doc, &list, index, priority);
        self.commit_if(changed)
    }

    pub fn set_due_date(&mut self, index: usize, date: Option<&str>) -> Result<bool, AppError> {
        let list = self.focused_list()?;
        let changed = tag_ops::set_due_date(&mut self.doc, &list, index, date);
        self.commit_if(changed)
    }

    pub fn set_recurrence(&mut self, index: usize, recurring: Recurrence) -> Result<bool, AppError> {
        let list = self.focused_list()?;
        let changed = tag_ops::set_recurrence(&mut self.doc, &list, index, recurring);
        self.commit_if(changed)
    }

    pub fn tag_item(&mut self, index: usize, tag: &str) -> Result<bool, AppError> {
        let list = self.focused_list()?;
        let changed = tag_ops::tag_item(&mut self.doc, &list, index, tag);
        self.commit_if(changed)
    }

    pub fn untag_item(&mut self, index: usize, tag: &str) -> Result<bool, AppError> {
        let list = self.focused_list()?;
        let changed = tag_ops::untag_item(&mut self.doc, &list, index, tag);
        self.commit_if(changed)
    }

    // -----------------------------------------------------------------------
    // Tag registry
    // -----------------------------------------------------------------------

    pub fn create_tag(&mut self, name: &str, color: Option<&str>) -> Result<bool, AppError> {
        let changed = tag_ops::create_tag(&mut self.doc, name, color);
        self.commit_if(changed)
    }

    pub fn delete_tag(&mut self, name: &str) -> Result<bool, AppError> {
        let changed = tag_ops::delete_tag(&mut self.doc, name);
        self.commit_if(changed)
    }

    pub fn recolor_tag(&mut self, name: &str, color: &str) -> Result<bool, AppError> {
        let changed = tag_ops::recolor_tag(&mut self.doc, name, color);
        self.commit_if(changed)
    }

    // -----------------------------------------------------------------------
    // Materials
    // -----------------------------------------------------------------------

    /// The focused task in the task view, otherwise the focused day
    pub fn attach_target(&self) -> Option<AttachTarget> {
        let c = &self.cursor;
        let (phase_id, week_id, day_id) = (c.phase_id.clone()?, c.week_id.clone()?, c.day_id.clone()?);
        match (c.view, c.task_index) {
            (View::Task, Some(index)) => Some(AttachTarget::Task {
                phase_id,
                week_id,
                day_id,
                index,
            }),
            (View::Day | View::Materials, _) => Some(AttachTarget::Day {
                phase_id,
                week_id,
                day_id,
            }),
            _ => None,
        }
    }

    fn with_materials<T>(
        &mut self,
        f: impl FnOnce(attach_ops::MaterialsMut<'_>) -> Result<T, AttachError>,
    ) -> Result<T, AppError> {
        let target = self.attach_target().ok_or(AttachError::MissingTarget)?;
        let materials =
            attach_ops::materials_mut(&mut self.doc, &target).ok_or(AttachError::MissingTarget)?;
        Ok(f(materials)?)
    }

    /// Append a note, optionally with text. Returns its index.
    pub fn add_note(&mut self, text: Option<&str>) -> Result<usize, AppError> {
        let index = self.with_materials(|m| {
            let index = attach_ops::add_note(m.notes);
            if let Some(text) = text {
                attach_ops::edit_note(m.notes, index, text)?;
            }
            Ok(index)
        })?;
        self.commit()?;
        Ok(index)
    }

    /// Note edits save without a re-render, like typing in place
    pub fn edit_note(&mut self, index: usize, text: &str) -> Result<(), AppError> {
        self.with_materials(|m| attach_ops::edit_note(m.notes, index, text))?;
        self.gateway.save_quietly(&self.doc)?;
        Ok(())
    }

    pub fn delete_note(&mut self, index: usize) -> Result<String, AppError> {
        let note = self.with_materials(|m| attach_ops::remove_at(m.notes, index, "note"))?;
        self.commit()?;
        Ok(note)
    }

    pub fn add_video(&mut self, url: &str) -> Result<(), AppError> {
        self.with_materials(|m| attach_ops::add_video(m.videos, url))?;
        self.commit()
    }

    pub fn delete_video(&mut self, index: usize) -> Result<String, AppError> {
        let url = self.with_materials(|m| attach_ops::remove_at(m.videos, index, "video"))?;
        self.commit()?;
        Ok(url)
    }

    pub fn add_link(&mut self, url: &str) -> Result<(), AppError> {
        self.with_materials(|m| {
            let links = m.links.ok_or(AttachError::Unsupported("links"))?;
            attach_ops::add_link(links, url)
        })?;
        self.commit()
    }

    pub fn delete_link(&mut self, index: usize) -> Result<String, AppError> {
        let url = self.with_materials(|m| {
            let links = m.links.ok_or(AttachError::Unsupported("links"))?;
            attach_ops::remove_at(links, index, "link")
        })?;
        self.commit()?;
        Ok(url)
    }

    /// Encode and attach file content, subject to the configured size limit
    pub fn attach_file(&mut self, name: &str, mime_type: &str, content: &[u8]) -> Result<(), AppError> {
        let limit = self.config.attachments.max_file_bytes;
        self.with_materials(|m| {
            let file = attach_ops::encode_file(name, mime_type, content, limit)?;
            attach_ops::add_file(m.files, file)
        })?;
        self.commit()
    }

    pub fn delete_file(&mut self, index: usize) -> Result<FileAttachment, AppError> {
        let file = self.with_materials(|m| {
            let files = m.files.ok_or(AttachError::Unsupported("files"))?;
            attach_ops::remove_at(files, index, "file")
        })?;
        self.commit()?;
        Ok(file)
    }

    // -----------------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------------

    /// Start accumulating time on the focused task or day. Switching target
    /// while running moves the timer.
    pub fn start_timer(&mut self) -> Result<bool, AppError> {
        let target = self.attach_target().ok_or(AttachError::MissingTarget)?;
        let moved = self.timer_target.as_ref() != Some(&target);
        self.timer_target = Some(target);
        Ok(self.timer.start() || moved)
    }

    pub fn pause_timer(&mut self) -> bool {
        self.timer.pause()
    }

    pub fn timer_running(&self) -> bool {
        self.timer.is_running()
    }

    /// Seconds recorded on the focused task or day
    pub fn time_spent(&self) -> Option<u64> {
        match self.focus() {
            Focus::Task(_, _, task) => Some(task.time_spent),
            Focus::Day(_, _, day) | Focus::Materials(day) => Some(day.time_spent),
            _ => None,
        }
    }

    /// One second passed: advance the elapsed timer and the countdown.
    ///
    /// The second is added to the stored document, re-read under the store
    /// lock, and that copy replaces ours. Edits made by other processes
    /// while the timer runs survive and become visible here.
    pub fn tick(&mut self) -> Result<TickReport, AppError> {
        let countdown = self.countdown.tick();
        let mut report = TickReport {
            elapsed: None,
            target_lost: false,
            countdown,
        };
        if !self.timer.is_running() {
            return Ok(report);
        }
        let elapsed = match &self.timer_target {
            Some(target) => {
                let timer = &self.timer;
                let (doc, elapsed) = self.gateway.update_quietly(&self.doc, |doc| {
                    attach_ops::materials_mut(doc, target).map(|m| {
                        timer.tick(m.time_spent);
                        *m.time_spent
                    })
                })?;
                self.doc = doc;
                self.cursor.reconcile(&self.doc);
                elapsed
            }
            None => None,
        };
        match elapsed {
            Some(secs) => {
                report.elapsed = Some(secs);
                tracing::debug!(elapsed = secs, "timer tick");
            }
            None => {
                tracing::info!("timer target is gone; stopping");
                self.timer.pause();
                self.timer_target = None;
                report.target_lost = true;
            }
        }
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Archive
    // -----------------------------------------------------------------------

    /// Archive an active phase by 1-based position or id
    pub fn archive_phase(&mut self, selector: &str) -> Result<(), AppError> {
        let id = pick(&self.doc.phases, selector, |p| &p.id)
            .ok_or_else(|| ArchiveError::PhaseNotFound(selector.to_string()))?;
        let now = self.clock.now();
        archive_ops::archive_phase(&mut self.doc, &id, now)?;
        self.cursor.reconcile(&self.doc);
        self.commit()
    }

    pub fn restore_phase(&mut self, id: &str) -> Result<(), AppError> {
        archive_ops::restore_phase(&mut self.doc, id)?;
        self.commit()
    }

    pub fn purge_archived(&mut self, id: &str) -> Result<(), AppError> {
        archive_ops::purge_archived(&mut self.doc, id)?;
        self.commit()
    }

    // -----------------------------------------------------------------------
    // Read models
    // -----------------------------------------------------------------------

    pub fn date_index(&self) -> IndexMap<String, DayLocation> {
        calendar::date_index(&self.doc)
    }

    pub fn month_grid(&self, year: i32, month: u32) -> Option<MonthGrid> {
        calendar::month_grid(year, month, &self.date_index(), self.clock.today())
    }

    pub fn analytics(&self) -> Analytics {
        analytics::analytics(&self.doc)
    }

    // -----------------------------------------------------------------------
    // Settings, import, export
    // -----------------------------------------------------------------------

    pub fn set_theme(&mut self, theme: Theme) -> Result<bool, AppError> {
        let changed = self.doc.settings.theme != theme;
        self.doc.settings.theme = theme;
        self.commit_if(changed)
    }

    /// Pretty JSON backup and its suggested file name
    pub fn export(&self) -> Result<(String, String), AppError> {
        let text = gateway::export(&self.doc)?;
        Ok((gateway::export_file_name(self.clock.today()), text))
    }

    /// Replace the whole document with a backup. The cursor goes home and
    /// the elapsed timer stops.
    pub fn import(&mut self, text: &str) -> Result<(), AppError> {
        let doc = gateway::import(text)?;
        self.doc = doc;
        self.cursor.go_home();
        self.timer.pause();
        self.timer_target = None;
        self.commit()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }
}

/// Parse a 1-based position into an index below `len`
fn position(selector: &str, len: usize) -> Option<usize> {
    let n: usize = selector.trim().parse().ok()?;
    (1..=len).contains(&n).then(|| n - 1)
}

/// Select by 1-based position, falling back to an exact id match
fn pick<T>(items: &[T], selector: &str, id: impl Fn(&T) -> &String) -> Option<String> {
    if let Some(i) = position(selector, items.len()) {
        return Some(id(&items[i]).clone());
    }
    items.iter().map(&id).find(|i| i.as_str() == selector.trim()).cloned()
}
