//! Client-local key-value storage for the dashboard
//!
//! This module provides the durable string key-value slots the session
//! layer mirrors its state into. Two backends are available: a JSON file on
//! disk and an in-process map.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};

/// Synchronous string key-value storage
///
/// Implementations use interior mutability so a single store can be shared
/// behind an `Arc` by the session layer and by tests seeding it.
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Set a key-value pair, replacing any previous value
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete a key; deleting a missing key is not an error
    fn delete(&self, key: &str) -> StorageResult<()>;
}

/// File-backed store keeping every entry in one JSON object
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Create a store backed by `path`; the file is created on first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> StorageResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        Ok(serde_json::from_str(&content)?)
    }

    /// Entries to build a write on; unreadable content is discarded so the
    /// write replaces it. The flag tells whether that happened.
    fn entries_for_write(&self) -> StorageResult<(BTreeMap<String, String>, bool)> {
        match self.read_entries() {
            Ok(entries) => Ok((entries, false)),
            Err(StorageError::Serialization(e)) => {
                warn!(
                    "Discarding unreadable store {}: {}",
                    self.path.display(),
                    e
                );
                Ok((BTreeMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        // Write to a sibling file first so a crash never leaves half a record behind.
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;

        debug!("Wrote {} entries to {}", entries.len(), self.path.display());
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let (mut entries, _) = self.entries_for_write()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let (mut entries, discarded) = self.entries_for_write()?;
        if entries.remove(key).is_some() || discarded {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

/// In-process store, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}
