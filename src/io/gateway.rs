use chrono::{DateTime, NaiveDate, Utc};

use crate::io::store::{KeyValueStore, StoreError};
use crate::model::document::Document;
use crate::ops::migrate::{migrate_str, MigrateError};
use crate::util::clock::stamp;

/// Key the current schema is stored under
pub const STORAGE_KEY: &str = "stride.v3";

/// Older keys, newest first. Read when `STORAGE_KEY` is absent, never written.
pub const LEGACY_KEYS: &[&str] = &["stride.v2", "stride.v1"];

/// Why `load` fell back to an empty document
#[derive(Debug, thiserror::Error)]
pub enum LoadProblem {
    #[error("stored data under {key} is malformed ({error}); started from an empty plan, original kept as {backup}")]
    Malformed {
        key: String,
        backup: String,
        error: MigrateError,
    },
    #[error("could not read stored data: {0}")]
    Unreadable(StoreError),
}

/// Result of hydrating the document at startup
#[derive(Debug)]
pub struct Loaded {
    pub document: Document,
    /// Key the document came from; `None` when nothing was stored
    pub source: Option<&'static str>,
    pub problem: Option<LoadProblem>,
}

/// Reads and writes the document against a key-value store and tracks
/// whether the last write asked for a re-render.
pub struct Gateway {
    store: Box<dyn KeyValueStore>,
    render_requested: bool,
}

impl Gateway {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Gateway {
            store,
            render_requested: false,
        }
    }

    /// Hydrate the document. Never fails: any problem yields the default
    /// document plus a description of what went wrong.
    pub fn load(&mut self) -> Loaded {
        let keys = std::iter::once(STORAGE_KEY).chain(LEGACY_KEYS.iter().copied());
        for key in keys {
            let text = match self.store.get(key) {
                Ok(Some(text)) => text,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(key, error = %e, "could not read store");
                    return Loaded {
                        document: Document::default(),
                        source: None,
                        problem: Some(LoadProblem::Unreadable(e)),
                    };
                }
            };
            return match migrate_str(&text) {
                Ok(document) => {
                    tracing::info!(key, phases = document.phases.len(), "loaded document");
                    Loaded {
                        document,
                        source: Some(key),
                        problem: None,
                    }
                }
                Err(error) => {
                    let backup = format!("{}.corrupt", key);
                    tracing::warn!(key, %error, backup = %backup, "stored document is malformed");
                    if let Err(e) = self.store.set(&backup, &text) {
                        tracing::warn!(error = %e, "could not keep a copy of the malformed document");
                    }
                    Loaded {
                        document: Document::default(),
                        source: Some(key),
                        problem: Some(LoadProblem::Malformed {
                            key: key.to_string(),
                            backup,
                            error,
                        }),
                    }
                }
            };
        }
        Loaded {
            document: Document::default(),
            source: None,
            problem: None,
        }
    }

    /// Stamp the last activity, persist, and ask for a re-render. A failed
    /// write leaves the previous stamp in place.
    pub fn save(&mut self, doc: &mut Document, now: DateTime<Utc>) -> Result<(), StoreError> {
        let previous = doc.settings.last_activity.replace(stamp(now));
        if let Err(e) = self.write(doc) {
            doc.settings.last_activity = previous;
            return Err(e);
        }
        self.render_requested = true;
        Ok(())
    }

    /// Persist without stamping or requesting a render. Used by note typing.
    pub fn save_quietly(&mut self, doc: &Document) -> Result<(), StoreError> {
        self.write(doc)
    }

    /// Re-read the stored document under the store lock, apply `f` to it
    /// and write it back quietly. Edits other processes made since this
    /// one loaded are kept. Returns the fresh document and what `f` returned.
    ///
    /// A missing or unreadable stored copy is replaced by `current`.
    pub fn update_quietly<T>(
        &mut self,
        current: &Document,
        f: impl FnOnce(&mut Document) -> T,
    ) -> Result<(Document, T), StoreError> {
        self.store.lock()?;
        let result = self.read_modify_write(current, f);
        self.store.unlock();
        result
    }

    fn read_modify_write<T>(
        &mut self,
        current: &Document,
        f: impl FnOnce(&mut Document) -> T,
    ) -> Result<(Document, T), StoreError> {
        let mut doc = match self.store.get(STORAGE_KEY)? {
            Some(text) => migrate_str(&text).unwrap_or_else(|error| {
                tracing::warn!(%error, "stored document is malformed; keeping the in-memory copy");
                current.clone()
            }),
            None => current.clone(),
        };
        let value = f(&mut doc);
        self.write(&doc)?;
        Ok((doc, value))
    }

    fn write(&mut self, doc: &Document) -> Result<(), StoreError> {
        let json = serde_json::to_string(doc).map_err(|e| StoreError::Io {
            path: STORAGE_KEY.into(),
            source: e.into(),
        })?;
        self.store.set(STORAGE_KEY, &json)?;
        tracing::debug!(bytes = json.len(), "saved document");
        Ok(())
    }

    /// Returns and clears the pending render request
    pub fn take_render_request(&mut self) -> bool {
        std::mem::take(&mut self.render_requested)
    }
}

/// Pretty JSON of the whole document, for backups
pub fn export(doc: &Document) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(doc)
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("stride-backup-{}.json", date.format("%Y-%m-%d"))
}

/// Parse and migrate a backup. The caller replaces its document wholesale.
pub fn import(text: &str) -> Result<Document, MigrateError> {
    let doc = migrate_str(text)?;
    tracing::info!(phases = doc.phases.len(), "imported document");
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use crate::io::store::MemoryStore;
    use crate::model::document::Phase;

    /// Store that hands out a shared map so tests can inspect it afterwards
    #[derive(Clone, Default)]
    struct Shared(std::rc::Rc<std::cell::RefCell<MemoryStore>>);

    impl KeyValueStore for Shared {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.0.borrow().get(key)
        }
        fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
            self.0.borrow_mut().set(key, value)
        }
        fn remove(&mut self, key: &str) -> Result<(), StoreError> {
            self.0.borrow_mut().remove(key)
        }
    }

    #[test]
    fn update_works_on_the_stored_copy() {
        let shared = Shared::default();
        let mut mine = Gateway::new(Box::new(shared.clone()));
        let mut stale = Document::default();
        stale.phases.push(Phase::new("1".into(), "Mine".into()));
        mine.save(&mut stale, now()).unwrap();

        // Someone else adds a phase after we loaded
        let mut other = Gateway::new(Box::new(shared.clone()));
        let mut theirs = other.load().document;
        theirs.phases.push(Phase::new("2".into(), "Theirs".into()));
        other.save(&mut theirs, now()).unwrap();

        let (fresh, count) = mine
            .update_quietly(&stale, |doc| {
                doc.phases[0].subtitle = "ticked".into();
                doc.phases.len()
            })
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(fresh.phases[1].title, "Theirs");
        assert!(!mine.take_render_request());

        let stored = Gateway::new(Box::new(shared)).load().document;
        assert_eq!(stored, fresh);
        assert_eq!(stored.phases[0].subtitle, "ticked");
    }

    #[test]
    fn update_on_empty_store_starts_from_current() {
        let mut gw = Gateway::new(Box::new(MemoryStore::new()));
        let mut current = Document::default();
        current.phases.push(Phase::new("1".into(), "Only".into()));
        let (fresh, ()) = gw.update_quietly(&current, |_| ()).unwrap();
        assert_eq!(fresh, current);
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 9, 8, 30, 0).unwrap()
    }

    #[test]
    fn empty_store_loads_default() {
        let mut gw = Gateway::new(Box::new(MemoryStore::new()));
        let loaded = gw.load();
        assert_eq!(loaded.document, Document::default());
        assert!(loaded.source.is_none());
        assert!(loaded.problem.is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let shared = Shared::default();
        let mut gw = Gateway::new(Box::new(shared.clone()));
        let mut doc = Document::default();
        doc.phases.push(Phase::new("1".into(), "Basics".into()));
        gw.save(&mut doc, now()).unwrap();
        assert_eq!(doc.settings.last_activity.as_deref(), Some("2025-03-09T08:30:00Z"));

        let mut again = Gateway::new(Box::new(shared));
        let loaded = again.load();
        assert_eq!(loaded.source, Some(STORAGE_KEY));
        assert_eq!(loaded.document, doc);
    }

    #[test]
    fn render_request_is_set_by_save_only() {
        let mut gw = Gateway::new(Box::new(MemoryStore::new()));
        let mut doc = Document::default();
        gw.save_quietly(&doc).unwrap();
        assert!(!gw.take_render_request());
        gw.save(&mut doc, now()).unwrap();
        assert!(gw.take_render_request());
        assert!(!gw.take_render_request());
    }

    #[test]
    fn malformed_data_falls_back_and_keeps_a_copy() {
        let shared = Shared::default();
        shared.0.borrow_mut().set(STORAGE_KEY, "{not json").unwrap();
        let mut gw = Gateway::new(Box::new(shared.clone()));
        let loaded = gw.load();
        assert_eq!(loaded.document, Document::default());
        assert!(matches!(loaded.problem, Some(LoadProblem::Malformed { .. })));
        assert_eq!(
            shared.0.borrow().get("stride.v3.corrupt").unwrap().as_deref(),
            Some("{not json")
        );
    }

    #[test]
    fn legacy_key_is_read_and_migrated() {
        let shared = Shared::default();
        shared
            .0
            .borrow_mut()
            .set(
                "stride.v1",
                r#"{"phases":[{"id":"1","title":"Old","goals":[{"text":"g","completed":true,"notes":"n"}],"weeks":[]}]}"#,
            )
            .unwrap();
        let mut gw = Gateway::new(Box::new(shared.clone()));
        let loaded = gw.load();
        assert_eq!(loaded.source, Some("stride.v1"));
        assert_eq!(loaded.document.phases[0].goals[0].notes, vec!["n"]);

        let mut doc = loaded.document;
        gw.save(&mut doc, now()).unwrap();
        assert!(shared.0.borrow().get(STORAGE_KEY).unwrap().is_some());
    }

    #[test]
    fn storage_full_is_surfaced() {
        let mut gw = Gateway::new(Box::new(MemoryStore::with_quota(16)));
        let mut doc = Document::default();
        doc.phases.push(Phase::new("1".into(), "A long phase title".into()));
        let err = gw.save(&mut doc, now()).unwrap_err();
        assert!(matches!(err, StoreError::StorageFull { limit: 16, .. }));
        assert!(!gw.take_render_request());
        assert_eq!(doc.phases.len(), 1);
        assert_eq!(doc.settings.last_activity, None);
    }

    #[test]
    fn export_import_round_trip() {
        let mut doc = Document::default();
        doc.phases.push(Phase::new("1".into(), "Basics".into()));
        let text = export(&doc).unwrap();
        assert!(text.contains("\n"));
        assert_eq!(import(&text).unwrap(), doc);
        assert!(import("[]").is_err());
        assert_eq!(
            export_file_name(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()),
            "stride-backup-2025-01-02.json"
        );
    }
}
