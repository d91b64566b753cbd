//! Context cache for execution results
//!
//! [`ContextManager`] fronts a [`CacheStorage`] backend: a bounded
//! in-memory LRU map or a directory of JSON files. Entries expire a fixed
//! TTL after they are written.

mod manager;
pub mod storage;
pub mod types;

#[cfg(test)]
mod tests;

pub use manager::ContextManager;
pub use storage::{CacheStorage, DiskStorage, MemoryStorage};
pub use types::{
    CacheBackendKind, CacheConfig, CacheEntry, CacheSize, StorageStatistics, cache_key,
};
