use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::ledger::LedgerSnapshot;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no data directory available on this platform")]
    NoDataDir,
}

/// Persistence port for the whole ledger snapshot.
pub trait SnapshotStore {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<LedgerSnapshot>, StorageError>;

    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), StorageError>;
}

impl<T: SnapshotStore + ?Sized> SnapshotStore for Box<T> {
    fn load(&self) -> Result<Option<LedgerSnapshot>, StorageError> {
        (**self).load()
    }

    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), StorageError> {
        (**self).save(snapshot)
    }
}

/// Default location of the data file, under the platform data directory.
pub fn default_data_file() -> Result<PathBuf, StorageError> {
    let base = dirs::data_dir()
        .or_else(dirs::home_dir)
        .ok_or(StorageError::NoDataDir)?;
    Ok(base.join("habit-ledger").join("habits.json"))
}

/// Snapshot stored as a single pretty-printed JSON document.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    storage_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: storage_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.storage_path
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<LedgerSnapshot>, StorageError> {
        if !self.storage_path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.storage_path)?;
        if contents.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Write through a temporary file and an atomic rename to avoid partial writes.
    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), StorageError> {
        if let Some(parent) = self.storage_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp = self.storage_path.with_extension("tmp");
        let mut f = File::create(&temp)?;
        let content = serde_json::to_string_pretty(snapshot)?;
        f.write_all(content.as_bytes())?;
        f.sync_all()?;
        fs::rename(temp, &self.storage_path)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    snapshot: Option<LedgerSnapshot>,
    saves: usize,
    fail_saves: bool,
}

/// In-process store. Clones share the same contents.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: LedgerSnapshot) -> Self {
        let store = Self::default();
        store.inner.lock().snapshot = Some(snapshot);
        store
    }

    /// Make every subsequent `save` fail with an I/O error.
    #[cfg(test)]
    pub(crate) fn fail_saves(&self, fail: bool) {
        self.inner.lock().fail_saves = fail;
    }

    /// Last snapshot written (or seeded), for callers that inspect what a
    /// ledger persisted.
    pub fn saved(&self) -> Option<LedgerSnapshot> {
        self.inner.lock().snapshot.clone()
    }

    /// Number of successful `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.inner.lock().saves
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<LedgerSnapshot>, StorageError> {
        Ok(self.inner.lock().snapshot.clone())
    }

    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        if inner.fail_saves {
            return Err(StorageError::Io(std::io::Error::other("save disabled")));
        }
        inner.snapshot = Some(snapshot.clone());
        inner.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Habit, HabitId};

    fn sample() -> LedgerSnapshot {
        LedgerSnapshot {
            habits: vec![Habit {
                id: HabitId::from("h1"),
                name: "Read".into(),
                streak: 2,
                target: 7,
            }],
            ..LedgerSnapshot::default()
        }
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("habits.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("habits.json"));
        store.save(&sample()).unwrap();
        assert!(!store.path().with_extension("tmp").exists());
        assert_eq!(store.load().unwrap(), Some(sample()));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("habits.json");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonFileStore::new(path);
        assert!(matches!(store.load(), Err(StorageError::Json(_))));
    }

    #[test]
    fn memory_store_can_refuse_saves() {
        let store = MemoryStore::new();
        store.fail_saves(true);
        assert!(store.save(&sample()).is_err());
        assert_eq!(store.save_count(), 0);
        store.fail_saves(false);
        store.save(&sample()).unwrap();
        assert_eq!(store.saved(), Some(sample()));
    }
}
