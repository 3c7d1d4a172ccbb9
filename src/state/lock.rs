//! Process-level wake lock.
//!
//! Wakes are not re-entrant: a cron-triggered wake and a running daemon must
//! never overlap. The lock is a file created with `create_new`; it is removed
//! when the guard drops. A lock file older than the stale window is assumed
//! to belong to a crashed wake and is replaced.

use crate::error::{CycleError, PersistenceError};
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Held for the duration of one wake.
#[derive(Debug)]
pub struct WakeLock {
    path: PathBuf,
}

impl WakeLock {
    pub fn acquire(path: &Path, stale_after: Duration) -> Result<Self, CycleError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| PersistenceError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        match Self::try_create(path) {
            Ok(lock) => Ok(lock),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if !is_stale(path, stale_after) {
                    return Err(CycleError::WakeInProgress(path.to_path_buf()));
                }
                warn!("Replacing stale wake lock at {:?}", path);
                let _ = fs::remove_file(path);
                Self::try_create(path).map_err(|e| match e.kind() {
                    ErrorKind::AlreadyExists => CycleError::WakeInProgress(path.to_path_buf()),
                    _ => PersistenceError::Io {
                        path: path.to_path_buf(),
                        source: e,
                    }
                    .into(),
                })
            }
            Err(source) => Err(PersistenceError::Io {
                path: path.to_path_buf(),
                source,
            }
            .into()),
        }
    }

    fn try_create(path: &Path) -> std::io::Result<Self> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        writeln!(file, "{} {}", std::process::id(), Utc::now().to_rfc3339())?;
        debug!("Acquired wake lock {:?}", path);
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WakeLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to release wake lock {:?}: {}", self.path, e);
        }
    }
}

fn is_stale(path: &Path, stale_after: Duration) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .map(|age| age >= stale_after)
        .unwrap_or(false)
}
