//! Flat key/value namespaces the journal persists into.
//!
//! `FileKeyValueStore` keeps the whole namespace in one JSON document and
//! rewrites it atomically on every write. `MemoryKeyValueStore` is the
//! in-process variant used by tests and embedders.
use std::{
    collections::BTreeMap,
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use log::{debug, error, info, trace, warn};
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::{JournalError, Result};

/// A flat namespace of named JSON values
pub trait KeyValueStore {
    /// Returns the value stored under `key`, if any
    fn get(&self, key: &str) -> Option<Value>;

    /// Stores `value` under `key`, replacing any previous value
    fn set(&mut self, key: &str, value: Value) -> Result<()>;

    /// Removes `key`; removing a missing key is not an error
    fn remove(&mut self, key: &str) -> Result<()>;

    /// Stores several values. Backends that can write them in one go should
    /// override this.
    fn set_many(&mut self, entries: Vec<(&str, Value)>) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// Key/value store backed by a single JSON file
#[derive(Debug)]
pub struct FileKeyValueStore {
    /// Location of the JSON document
    path: PathBuf,

    /// In-memory copy of the document
    entries: BTreeMap<String, Value>,
}

impl FileKeyValueStore {
    /// Opens the store at `path`.
    ///
    /// A missing file is an empty namespace. A file that cannot be read or
    /// parsed is logged and also treated as empty; the next write replaces it.
    /// Only failing to create the parent directory is reported as an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        info!("Opening key-value store at {}", path.display());

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating store directory: {}", parent.display());
                fs::create_dir_all(parent).map_err(|e| {
                    error!("Failed to create store directory {}: {}", parent.display(), e);
                    JournalError::DirectoryError {
                        path: parent.to_path_buf(),
                    }
                })?;
            }
        }

        let entries = match Self::read_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    "Ignoring unreadable key-value store {}: {}",
                    path.display(),
                    e
                );
                BTreeMap::new()
            }
        };

        debug!("Key-value store holds {} keys", entries.len());
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(path: &Path) -> Result<BTreeMap<String, Value>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No store file at {}, starting empty", path.display());
                return Ok(BTreeMap::new());
            }
            Err(e) => return Err(JournalError::Io(e)),
        };

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        Ok(serde_json::from_str(&content)?)
    }

    /// Writes the whole namespace to disk through a temporary file so a
    /// crash mid-write never leaves a truncated document behind
    fn flush(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        trace!("Serializing {} keys", self.entries.len());
        let json = serde_json::to_string_pretty(&self.entries).map_err(|e| {
            error!("Failed to serialize key-value store: {}", e);
            JournalError::Serialization(e)
        })?;

        let mut temp_file = NamedTempFile::new_in(dir).map_err(|e| {
            error!("Failed to create temporary file in {}: {}", dir.display(), e);
            JournalError::Io(e)
        })?;

        temp_file.write_all(json.as_bytes())?;
        temp_file.flush()?;

        temp_file.persist(&self.path).map_err(|e| {
            error!("Failed to persist {}: {}", self.path.display(), e.error);
            JournalError::Io(e.error)
        })?;

        debug!("Flushed key-value store to {}", self.path.display());
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn set_many(&mut self, entries: Vec<(&str, Value)>) -> Result<()> {
        for (key, value) in entries {
            self.entries.insert(key.to_string(), value);
        }
        self.flush()
    }
}

/// Key/value store that lives only in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryKeyValueStore {
    entries: BTreeMap<String, Value>,
    fail_writes: bool,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail, leaving stored values untouched
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes {
            return Err(JournalError::WriteFailed {
                message: "memory store is read-only".to_string(),
            });
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.check_writable()?;
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.check_writable()?;
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_memory_store_basic_operations() {
        let mut store = MemoryKeyValueStore::new();
        assert!(store.get("monthlyGoal").is_none());

        store.set("monthlyGoal", json!(6)).unwrap();
        assert_eq!(store.get("monthlyGoal"), Some(json!(6)));

        store.remove("monthlyGoal").unwrap();
        assert!(store.is_empty());

        // Removing twice is fine
        store.remove("monthlyGoal").unwrap();
    }

    #[test]
    fn test_memory_store_write_failure_keeps_values() {
        let mut store = MemoryKeyValueStore::new();
        store.set("hasSeenOnboarding", json!(true)).unwrap();
        store.set_fail_writes(true);

        assert!(store.set("hasSeenOnboarding", json!(false)).is_err());
        assert!(store.remove("hasSeenOnboarding").is_err());
        assert_eq!(store.get("hasSeenOnboarding"), Some(json!(true)));
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("journal.json");

        {
            let mut store = FileKeyValueStore::open(&path).unwrap();
            store
                .set_many(vec![("monthlyGoal", json!(7)), ("trips", json!([]))])
                .unwrap();
            store.set("hasSeenOnboarding", json!(true)).unwrap();
        }

        let store = FileKeyValueStore::open(&path).unwrap();
        assert_eq!(store.get("monthlyGoal"), Some(json!(7)));
        assert_eq!(store.get("trips"), Some(json!([])));
        assert_eq!(store.get("hasSeenOnboarding"), Some(json!(true)));
    }

    #[test]
    fn test_file_store_remove_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.json");

        let mut store = FileKeyValueStore::open(&path).unwrap();
        store.set("trips", json!([1, 2])).unwrap();
        store.remove("trips").unwrap();

        let reopened = FileKeyValueStore::open(&path).unwrap();
        assert!(reopened.get("trips").is_none());
    }

    #[test]
    fn test_file_store_corrupt_file_opens_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.json");
        fs::write(&path, "{ this is not json").unwrap();

        let mut store = FileKeyValueStore::open(&path).unwrap();
        assert!(store.get("trips").is_none());

        // The next write replaces the broken document
        store.set("monthlyGoal", json!(3)).unwrap();
        let reopened = FileKeyValueStore::open(&path).unwrap();
        assert_eq!(reopened.get("monthlyGoal"), Some(json!(3)));
    }
}
