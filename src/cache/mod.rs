//! Response caching for rate-limited upstream APIs
//!
//! The cache manager keys entries by request signature and honors a per-entry
//! TTL; storage is pluggable between memory and a flat JSON file.

pub mod manager;
pub mod store;

pub use manager::{CacheEntry, CacheManager};
pub use store::{CacheStore, JsonFileStore, MemoryStore, StoreError};
