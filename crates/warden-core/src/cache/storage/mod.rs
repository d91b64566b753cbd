//! Cache storage implementations

mod disk;
mod memory;

pub use disk::DiskStorage;
pub use memory::MemoryStorage;

use super::types::{CacheEntry, StorageStatistics};
use crate::error::WardenResult;
use async_trait::async_trait;

/// Cache storage interface
///
/// Expired entries are never returned: `get` removes them lazily and
/// reports a miss.
#[async_trait]
pub trait CacheStorage: Send + Sync + std::fmt::Debug {
    async fn get(&self, key: &str) -> WardenResult<Option<CacheEntry>>;

    /// Insert or replace an entry
    async fn set(&self, key: &str, entry: CacheEntry) -> WardenResult<()>;

    /// Remove an entry; returns whether it existed
    async fn remove(&self, key: &str) -> WardenResult<bool>;

    /// Remove entries whose key contains `pattern`, or all entries
    async fn clear(&self, pattern: Option<&str>) -> WardenResult<usize>;

    /// Live entries with their keys
    async fn entries(&self) -> WardenResult<Vec<(String, CacheEntry)>>;

    async fn statistics(&self) -> WardenResult<StorageStatistics>;

    /// Remove expired entries; returns how many were removed
    async fn cleanup_expired(&self) -> WardenResult<usize>;
}

fn matches(key: &str, pattern: Option<&str>) -> bool {
    pattern.is_none_or(|pattern| key.contains(pattern))
}
