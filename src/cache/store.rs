//! Storage backends for the cache manager
//!
//! A `CacheStore` loads and saves the whole entry map; the manager keeps the
//! working set in memory and pushes the map down on every mutation. Backends
//! are injectable so the cache can run memory-only or persist to disk without
//! the manager caring which.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

use super::manager::CacheEntry;

/// Errors raised by a storage backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("cache storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted document did not parse
    #[error("persisted cache is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Loads and saves the full cache entry map
pub trait CacheStore: Send + Sync {
    /// Loads all persisted entries
    fn load(&self) -> Result<HashMap<String, CacheEntry>, StoreError>;

    /// Persists the full entry map, replacing whatever was stored before
    fn save(&self, entries: &HashMap<String, CacheEntry>) -> Result<(), StoreError>;
}

/// In-memory backend; entries vanish when the process exits
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryStore {
    /// Creates an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn load(&self) -> Result<HashMap<String, CacheEntry>, StoreError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    fn save(&self, entries: &HashMap<String, CacheEntry>) -> Result<(), StoreError> {
        *self.entries.lock().unwrap_or_else(|e| e.into_inner()) = entries.clone();
        Ok(())
    }
}

/// Flat-JSON-file backend
///
/// A missing file loads as an empty map so first runs need no setup; parent
/// directories are created on the first save.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store backed by the given file path
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns the backing file path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl CacheStore for JsonFileStore {
    fn load(&self) -> Result<HashMap<String, CacheEntry>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, entries: &HashMap<String, CacheEntry>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_entries() -> HashMap<String, CacheEntry> {
        let mut entries = HashMap::new();
        entries.insert(
            "key".to_string(),
            CacheEntry::new(json!({"title": "X"}), Utc::now(), 60),
        );
        entries
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        let entries = sample_entries();

        store.save(&entries).unwrap();

        assert_eq!(store.load().unwrap(), entries);
    }

    #[test]
    fn test_json_file_store_roundtrip() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = JsonFileStore::new(temp_dir.path().join("cache.json"));
        let entries = sample_entries();

        store.save(&entries).unwrap();

        assert_eq!(store.load().unwrap(), entries);
    }

    #[test]
    fn test_json_file_store_missing_file_loads_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = JsonFileStore::new(temp_dir.path().join("absent.json"));

        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_json_file_store_creates_parent_directories() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = JsonFileStore::new(temp_dir.path().join("nested/dirs/cache.json"));

        store.save(&sample_entries()).unwrap();

        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn test_json_file_store_rejects_corrupt_document() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("cache.json");
        fs::write(&path, "{not json").unwrap();

        let store = JsonFileStore::new(path);
        assert!(matches!(store.load(), Err(StoreError::InvalidJson(_))));
    }
}
