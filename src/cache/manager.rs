//! Cache manager for expensive API responses
//!
//! Provides a `CacheManager` that stores opaque JSON payloads keyed by request
//! signature, with a per-entry TTL, explicit invalidation, and an optional
//! FIFO capacity bound. Entries live behind a pluggable `CacheStore` so the
//! cache can be memory-only or persisted to disk.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

use super::store::{CacheStore, MemoryStore};

/// A single cached payload with its expiry bookkeeping
///
/// The payload is kept as opaque JSON so any serializable response can round-
/// trip through the cache unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    /// The cached payload
    value: Value,
    /// When the entry was stored
    created_at: DateTime<Utc>,
    /// How long the entry stays fresh, in seconds
    ttl_seconds: u64,
}

impl CacheEntry {
    /// Creates an entry stored at `created_at` with the given TTL
    pub fn new(value: Value, created_at: DateTime<Utc>, ttl_seconds: u64) -> Self {
        Self {
            value,
            created_at,
            ttl_seconds,
        }
    }

    /// Returns the cached payload
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns when the entry was stored
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// An entry is valid iff `now < created_at + ttl_seconds`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.created_at + Duration::seconds(self.ttl_seconds as i64)
    }
}

/// Manages cached API responses keyed by request signature
///
/// Reads are concurrent; writes to the map are serialized through an
/// `RwLock`, so a reader never observes a partially written entry and racing
/// writes to the same key resolve last-writer-wins. A miss (absent or
/// expired entry) is a normal outcome, never an error.
#[derive(Clone)]
pub struct CacheManager {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    store: Arc<dyn CacheStore>,
    /// Entry count above which oldest entries are evicted first (FIFO)
    max_entries: Option<usize>,
}

impl CacheManager {
    /// Creates a memory-only cache manager with no capacity bound
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), None)
    }

    /// Creates a cache manager over the given storage backend
    ///
    /// Previously persisted entries are loaded eagerly; a backend that fails
    /// to load starts the cache empty rather than failing construction.
    pub fn with_store(store: Arc<dyn CacheStore>, max_entries: Option<usize>) -> Self {
        let entries = match store.load() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("failed to load persisted cache, starting empty: {e}");
                HashMap::new()
            }
        };
        Self {
            entries: Arc::new(RwLock::new(entries)),
            store,
            max_entries,
        }
    }

    /// Retrieves a cached value if present and unexpired
    ///
    /// Expired entries are treated as misses and never returned stale; an
    /// access that finds an expired entry also purges it.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_at(key, Utc::now())
    }

    /// Retrieves a cached value judged against the given instant
    ///
    /// Split out from [`get`](Self::get) so expiry can be exercised with a
    /// simulated clock.
    pub fn get_at<T: DeserializeOwned>(&self, key: &str, now: DateTime<Utc>) -> Option<T> {
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            let entry = entries.get(key)?;
            if entry.is_valid_at(now) {
                return match serde_json::from_value(entry.value.clone()) {
                    Ok(value) => {
                        debug!(key, "cache hit");
                        Some(value)
                    }
                    Err(e) => {
                        warn!(key, "cached payload failed to deserialize: {e}");
                        None
                    }
                };
            }
        }

        // Expired: upgrade to a write and purge lazily. Re-check under the
        // write lock, a racing set may have refreshed the entry meanwhile.
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.get(key).is_some_and(|entry| !entry.is_valid_at(now)) {
            debug!(key, "cache entry expired, purged on access");
            entries.remove(key);
            self.persist(&entries);
        }
        None
    }

    /// Stores or overwrites an entry, resetting its creation timestamp
    ///
    /// Serialization failures are logged and dropped; the cache is an
    /// optimization, not a source of truth.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: u64) {
        self.set_at(key, value, ttl_seconds, Utc::now());
    }

    /// Stores an entry stamped with the given instant
    pub fn set_at<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: u64, now: DateTime<Utc>) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, "failed to serialize value for cache: {e}");
                return;
            }
        };

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), CacheEntry::new(value, now, ttl_seconds));

        if let Some(max) = self.max_entries {
            Self::evict_oldest(&mut entries, max);
        }

        self.persist(&entries);
    }

    /// Removes a single entry
    pub fn invalidate(&self, key: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.remove(key).is_some() {
            debug!(key, "cache entry invalidated");
            self.persist(&entries);
        }
    }

    /// Removes every entry
    pub fn invalidate_all(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if !entries.is_empty() {
            entries.clear();
            self.persist(&entries);
        }
    }

    /// Purges all expired entries, returning how many were removed
    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(Utc::now())
    }

    /// Purges entries expired as of the given instant
    pub fn evict_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| entry.is_valid_at(now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "evicted expired cache entries");
            self.persist(&entries);
        }
        removed
    }

    /// Returns the number of entries currently held, expired or not
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns true when the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops oldest-by-creation-time entries until at most `max` remain
    ///
    /// FIFO rather than LRU: hit-frequency tracking is unnecessary at this
    /// scale, and creation order is already persisted.
    fn evict_oldest(entries: &mut HashMap<String, CacheEntry>, max: usize) {
        while entries.len() > max {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.created_at)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    debug!(key = %key, "evicting oldest cache entry over capacity");
                    entries.remove(&key);
                }
                None => break,
            }
        }
    }

    fn persist(&self, entries: &HashMap<String, CacheEntry>) {
        if let Err(e) = self.store.save(entries) {
            warn!("failed to persist cache: {e}");
        }
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new()
    }
}
