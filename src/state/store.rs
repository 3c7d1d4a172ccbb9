//! Key-value persistence for the queue, ledger and cycle state.
//!
//! Values are JSON documents stored under fixed well-known keys. The file
//! store keeps every document in a single `state.json`, rewritten through a
//! temp file and one rename, so a flush lands whole or not at all.

use crate::curiosity::CuriosityQueue;
use crate::error::PersistenceError;
use crate::taste::TasteLedger;
use crate::types::CycleState;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::{debug, warn};

pub const QUEUE_KEY: &str = "queue";
pub const LEDGER_KEY: &str = "ledger";
pub const CYCLE_KEY: &str = "cycle";

/// Load/save of raw JSON documents keyed by name.
pub trait StateStore: Send + Sync {
    /// `None` when nothing has been saved under `key` yet.
    fn load_raw(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    /// Replace every given document. Either all become visible or none do.
    fn save_all(&self, documents: &[(&str, String)]) -> Result<(), PersistenceError>;
}

/// Everything a wake cycle reads at start and flushes at end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub queue: CuriosityQueue,
    pub ledger: TasteLedger,
    pub cycle: CycleState,
}

impl Snapshot {
    pub fn load(store: &dyn StateStore) -> Result<Self, PersistenceError> {
        Ok(Self {
            queue: load_json(store, QUEUE_KEY)?,
            ledger: load_json(store, LEDGER_KEY)?,
            cycle: load_json(store, CYCLE_KEY)?,
        })
    }

    pub fn save(&self, store: &dyn StateStore) -> Result<(), PersistenceError> {
        store.save_all(&[
            (QUEUE_KEY, to_json(QUEUE_KEY, &self.queue)?),
            (LEDGER_KEY, to_json(LEDGER_KEY, &self.ledger)?),
            (CYCLE_KEY, to_json(CYCLE_KEY, &self.cycle)?),
        ])
    }
}

fn load_json<T: DeserializeOwned + Default>(
    store: &dyn StateStore,
    key: &str,
) -> Result<T, PersistenceError> {
    match store.load_raw(key)? {
        Some(raw) => serde_json::from_str(&raw).map_err(|source| PersistenceError::Corrupt {
            key: key.to_string(),
            source,
        }),
        None => Ok(T::default()),
    }
}

fn to_json<T: Serialize>(key: &str, value: &T) -> Result<String, PersistenceError> {
    serde_json::to_string_pretty(value).map_err(|source| PersistenceError::Serialize {
        key: key.to_string(),
        source,
    })
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// All documents as one JSON object in `<dir>/state.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

pub const STATE_FILE: &str = "state.json";

type Documents = BTreeMap<String, serde_json::Value>;

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.join(format!(".{STATE_FILE}.tmp"))
    }

    fn read_documents(&self) -> Result<Documents, PersistenceError> {
        let path = self.path();
        match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| PersistenceError::Corrupt {
                key: STATE_FILE.to_string(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Documents::new()),
            Err(source) => Err(PersistenceError::Io { path, source }),
        }
    }

    fn write_temp(&self, contents: &[u8]) -> Result<PathBuf, PersistenceError> {
        let tmp = self.temp_path();
        let io = |source: std::io::Error| PersistenceError::Io {
            path: tmp.clone(),
            source,
        };
        let mut file = fs::File::create(&tmp).map_err(io)?;
        file.write_all(contents).map_err(io)?;
        file.sync_all().map_err(io)?;
        Ok(tmp)
    }
}

impl StateStore for JsonFileStore {
    fn load_raw(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.read_documents()?.get(key).map(|v| v.to_string()))
    }

    fn save_all(&self, documents: &[(&str, String)]) -> Result<(), PersistenceError> {
        let mut merged = self.read_documents()?;
        for (key, contents) in documents {
            let value = serde_json::from_str(contents).map_err(|source| {
                PersistenceError::Serialize {
                    key: (*key).to_string(),
                    source,
                }
            })?;
            merged.insert((*key).to_string(), value);
        }
        let bytes = serde_json::to_vec_pretty(&merged).map_err(|source| {
            PersistenceError::Serialize {
                key: STATE_FILE.to_string(),
                source,
            }
        })?;

        fs::create_dir_all(&self.dir).map_err(|source| PersistenceError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let tmp = match self.write_temp(&bytes) {
            Ok(tmp) => tmp,
            Err(e) => {
                discard(&self.temp_path());
                return Err(e);
            }
        };

        let path = self.path();
        if let Err(source) = fs::rename(&tmp, &path) {
            discard(&tmp);
            return Err(PersistenceError::Io { path, source });
        }
        debug!("Flushed {} state documents to {:?}", documents.len(), path);
        Ok(())
    }
}

fn discard(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove temp file {:?}: {}", path, e),
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Store kept entirely in memory, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<String, String>>,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save_all` fail with an I/O error.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl StateStore for MemoryStore {
    fn load_raw(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let docs = self.documents.lock().map_err(|_| poisoned(key))?;
        Ok(docs.get(key).cloned())
    }

    fn save_all(&self, documents: &[(&str, String)]) -> Result<(), PersistenceError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PersistenceError::Io {
                path: PathBuf::from("memory"),
                source: std::io::Error::new(std::io::ErrorKind::Other, "simulated write failure"),
            });
        }
        let mut docs = self.documents.lock().map_err(|_| poisoned("memory"))?;
        for (key, contents) in documents {
            docs.insert((*key).to_string(), contents.clone());
        }
        Ok(())
    }
}

fn poisoned(key: &str) -> PersistenceError {
    PersistenceError::Io {
        path: PathBuf::from(key),
        source: std::io::Error::new(std::io::ErrorKind::Other, "store lock poisoned"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IdeaSubmission;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn missing_documents_load_as_defaults() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        let snapshot = Snapshot::load(&store).unwrap();
        assert_eq!(snapshot, Snapshot::default());
    }

    #[test]
    fn file_store_persists_and_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("state"));

        let mut snapshot = Snapshot::default();
        snapshot.cycle.cycle_index = 41;
        snapshot.queue.add(
            IdeaSubmission {
                topic: "Memory decay".into(),
                source: "feed:1".into(),
                categories: Default::default(),
                score: 0.4,
            },
            Utc::now(),
        );
        snapshot.ledger.record_rejection("JSON escaper", "boring", "vibe").unwrap();
        snapshot.save(&store).unwrap();

        let loaded = Snapshot::load(&store).unwrap();
        assert_eq!(loaded, snapshot);

        assert!(no_temp_files(&dir.path().join("state")));
    }

    fn no_temp_files(dir: &Path) -> bool {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .all(|e| !e.file_name().to_string_lossy().ends_with(".tmp"))
    }

    fn snapshot_at(index: u64) -> Snapshot {
        let mut snapshot = Snapshot::default();
        snapshot.cycle.cycle_index = index;
        snapshot.queue.add(
            IdeaSubmission {
                topic: format!("Idea {index}"),
                source: "feed:1".into(),
                categories: Default::default(),
                score: 0.4,
            },
            Utc::now(),
        );
        snapshot
    }

    #[test]
    fn invalid_later_document_leaves_earlier_ones_untouched() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        let old = snapshot_at(1);
        old.save(&store).unwrap();

        let new_queue = serde_json::to_string(&snapshot_at(2).queue).unwrap();
        let err = store
            .save_all(&[
                (QUEUE_KEY, new_queue),
                (LEDGER_KEY, "{not json".to_string()),
                (CYCLE_KEY, "{}".to_string()),
            ])
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Serialize { ref key, .. } if key == LEDGER_KEY));

        assert_eq!(Snapshot::load(&store).unwrap(), old);
        assert!(no_temp_files(dir.path()));
    }

    #[test]
    fn failed_staging_keeps_previous_state() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        let old = snapshot_at(1);
        old.save(&store).unwrap();

        // A directory squatting on the temp path makes the staged write fail.
        let squatter = dir.path().join(format!(".{STATE_FILE}.tmp"));
        fs::create_dir(&squatter).unwrap();
        fs::write(squatter.join("keep"), "x").unwrap();

        assert!(matches!(
            snapshot_at(2).save(&store),
            Err(PersistenceError::Io { .. })
        ));
        assert_eq!(Snapshot::load(&store).unwrap(), old);
    }

    #[test]
    fn unusable_state_path_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());

        // A non-empty directory where state.json belongs.
        let target = dir.path().join(STATE_FILE);
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), "x").unwrap();

        let err = snapshot_at(2).save(&store).unwrap_err();
        assert!(matches!(err, PersistenceError::Io { .. }));
        assert!(no_temp_files(dir.path()));
        assert!(target.join("keep").is_file());
    }

    #[test]
    fn corrupt_document_is_a_persistence_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(STATE_FILE), "{not json").unwrap();
        let store = JsonFileStore::new(dir.path());
        match Snapshot::load(&store) {
            Err(PersistenceError::Corrupt { key, .. }) => assert_eq!(key, STATE_FILE),
            other => panic!("expected corrupt error, got {other:?}"),
        }
    }

    #[test]
    fn memory_store_can_simulate_failures() {
        let store = MemoryStore::new();
        Snapshot::default().save(&store).unwrap();
        store.fail_saves(true);
        assert!(Snapshot::default().save(&store).is_err());
        store.fail_saves(false);
        assert!(Snapshot::load(&store).is_ok());
    }
}
