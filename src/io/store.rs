use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::io::lock::{self, LockError, StoreLock};

/// Error type for key-value store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage full: writing needs {needed} bytes but the store is limited to {limit}")]
    StorageFull { needed: usize, limit: usize },
    #[error("could not access {path}: {source}")]
    Io {
        path: PathBuf,
        source: io::Error,
    },
    #[error(transparent)]
    Lock(#[from] LockError),
}

/// A string key-value store with an optional total size ceiling
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;

    /// Keep other processes out until the matching `unlock`, so a read and
    /// the write based on it happen as one step. Calls nest.
    fn lock(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    fn unlock(&mut self) {}
}

/// Size the store would hold after replacing `key` with `value`, checked
/// against `quota`. Keys count towards the total.
fn check_quota(
    quota: Option<usize>,
    used_by_others: usize,
    key: &str,
    value: &str,
) -> Result<(), StoreError> {
    let Some(limit) = quota else {
        return Ok(());
    };
    let needed = used_by_others + key.len() + value.len();
    if needed > limit {
        tracing::warn!(key, needed, limit, "store quota exceeded");
        return Err(StoreError::StorageFull { needed, limit });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        MemoryStore {
            entries: HashMap::new(),
            quota: Some(quota),
        }
    }

    fn used_excluding(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        check_quota(self.quota, self.used_excluding(key), key, value)?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Directory-backed store
// ---------------------------------------------------------------------------

/// One `<key>.json` file per key inside a data directory.
///
/// Writes go through a temp file and rename. Each write takes the directory
/// lock unless `lock` already holds it.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    quota: Option<usize>,
    held: Option<StoreLock>,
    depth: usize,
}

impl FileStore {
    pub fn open(dir: &Path, quota: Option<usize>) -> Result<Self, StoreError> {
        fs::create_dir_all(dir).map_err(|e| StoreError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        Ok(FileStore {
            dir: dir.to_path_buf(),
            quota,
            held: None,
            depth: 0,
        })
    }

    pub fn is_locked(&self) -> bool {
        self.held.is_some()
    }

    /// Run `f` under the directory lock, reusing a held one
    fn locked<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, StoreError>) -> Result<T, StoreError> {
        self.lock()?;
        let result = f(self);
        self.unlock();
        result
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn used_excluding(&self, key: &str) -> Result<usize, StoreError> {
        let skip = self.path_for(key);
        let entries = fs::read_dir(&self.dir).map_err(|e| StoreError::Io {
            path: self.dir.clone(),
            source: e,
        })?;
        let mut total = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path == skip || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let stem_len = path.file_stem().map(|s| s.len()).unwrap_or(0);
            let size = entry.metadata().map(|m| m.len() as usize).unwrap_or(0);
            total += stem_len + size;
        }
        Ok(total)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io { path, source: e }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.locked(|store| {
            check_quota(store.quota, store.used_excluding(key)?, key, value)?;
            let path = store.path_for(key);
            atomic_write(&path, value.as_bytes()).map_err(|e| StoreError::Io { path, source: e })
        })
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.locked(|store| {
            let path = store.path_for(key);
            match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(StoreError::Io { path, source: e }),
            }
        })
    }

    fn lock(&mut self) -> Result<(), StoreError> {
        if self.held.is_none() {
            self.held = Some(StoreLock::acquire(&self.dir, lock::DEFAULT_WAIT)?);
            tracing::debug!(dir = %self.dir.display(), "store locked");
        }
        self.depth += 1;
        Ok(())
    }

    fn unlock(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.held = None;
        }
    }
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
