//! Exclusive lock on a data directory.
//!
//! The lock file `.lock` is created once and never removed. Every process
//! opens the same inode, so `flock` on it serializes them: a one-shot
//! command holds the lock from load to save, and a running timer takes it
//! for each read-modify-write tick.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

const LOCK_FILE: &str = ".lock";

/// How long a writer waits for another stride process before giving up
pub const DEFAULT_WAIT: Duration = Duration::from_secs(5);

const POLL: Duration = Duration::from_millis(10);

/// Error type for lock operations
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not open lock file {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("{path} is held by another stride process")]
    Busy { path: PathBuf },
}

/// A held directory lock. Dropping it unlocks; the file stays.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Take the lock without waiting. `None` when someone else holds it.
    pub fn try_acquire(dir: &Path) -> Result<Option<Self>, LockError> {
        let path = dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::Open {
                path: path.clone(),
                source,
            })?;
        if flock(&file, true) {
            Ok(Some(StoreLock { file, path }))
        } else {
            Ok(None)
        }
    }

    /// Take the lock, polling until `wait` runs out
    pub fn acquire(dir: &Path, wait: Duration) -> Result<Self, LockError> {
        let deadline = Instant::now() + wait;
        loop {
            if let Some(lock) = Self::try_acquire(dir)? {
                return Ok(lock);
            }
            if Instant::now() >= deadline {
                let path = dir.join(LOCK_FILE);
                tracing::warn!(path = %path.display(), "gave up waiting for the store lock");
                return Err(LockError::Busy { path });
            }
            thread::sleep(POLL);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        flock(&self.file, false);
    }
}

/// Lock (`exclusive = true`, non-blocking) or unlock the whole file
#[cfg(unix)]
fn flock(file: &File, exclusive: bool) -> bool {
    use std::os::unix::io::AsRawFd;
    let op = if exclusive {
        libc::LOCK_EX | libc::LOCK_NB
    } else {
        libc::LOCK_UN
    };
    unsafe { libc::flock(file.as_raw_fd(), op) == 0 }
}

#[cfg(not(unix))]
fn flock(_file: &File, _exclusive: bool) -> bool {
    true
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn held_lock_blocks_others() {
        let tmp = TempDir::new().unwrap();
        let held = StoreLock::try_acquire(tmp.path()).unwrap().unwrap();
        assert!(StoreLock::try_acquire(tmp.path()).unwrap().is_none());
        let waited = StoreLock::acquire(tmp.path(), Duration::from_millis(30));
        assert!(matches!(waited, Err(LockError::Busy { .. })));
        drop(held);
        assert!(StoreLock::try_acquire(tmp.path()).unwrap().is_some());
    }

    #[test]
    fn lock_file_survives_release() {
        let tmp = TempDir::new().unwrap();
        let lock = StoreLock::acquire(tmp.path(), DEFAULT_WAIT).unwrap();
        let path = lock.path().to_path_buf();
        drop(lock);
        assert!(path.exists());
    }

    #[test]
    fn waiter_and_newcomer_share_one_inode() {
        use std::os::unix::fs::MetadataExt;

        let tmp = TempDir::new().unwrap();
        let first = StoreLock::try_acquire(tmp.path()).unwrap().unwrap();
        let inode = first.file.metadata().unwrap().ino();
        drop(first);

        // Whoever locks next uses the same file, so no two holders can
        // each think they own the lock.
        let second = StoreLock::try_acquire(tmp.path()).unwrap().unwrap();
        assert_eq!(second.file.metadata().unwrap().ino(), inode);
        assert!(StoreLock::try_acquire(tmp.path()).unwrap().is_none());
    }
}
