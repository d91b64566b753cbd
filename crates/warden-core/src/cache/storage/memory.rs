//! In-memory LRU storage

use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use tokio::sync::Mutex;

use super::{CacheStorage, matches};
use crate::cache::types::{CacheEntry, StorageStatistics};
use crate::error::WardenResult;

#[derive(Debug)]
struct MemoryState {
    cache: LruCache<String, CacheEntry>,
    stats: StorageStatistics,
}

impl MemoryState {
    fn pop(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.cache.pop(key)?;
        self.stats.size_bytes = self.stats.size_bytes.saturating_sub(entry.size_bytes as u64);
        self.stats.entry_count = self.cache.len();
        Some(entry)
    }
}

/// In-memory cache storage using an LRU map
#[derive(Debug)]
pub struct MemoryStorage {
    state: Mutex<MemoryState>,
}

impl MemoryStorage {
    /// Create a storage holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(MemoryState {
                cache: LruCache::new(capacity),
                stats: StorageStatistics::default(),
            }),
        }
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn get(&self, key: &str) -> WardenResult<Option<CacheEntry>> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let expired = match state.cache.get_mut(key) {
            Some(entry) if entry.is_expired() => true,
            Some(entry) => {
                entry.mark_accessed();
                let entry = entry.clone();
                state.stats.hits += 1;
                return Ok(Some(entry));
            }
            None => false,
        };

        if expired {
            state.pop(key);
            state.stats.evictions += 1;
        }
        state.stats.misses += 1;
        Ok(None)
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> WardenResult<()> {
        let mut state = self.state.lock().await;
        let size = entry.size_bytes as u64;

        if let Some((old_key, old_entry)) = state.cache.push(key.to_string(), entry) {
            state.stats.size_bytes = state.stats.size_bytes.saturating_sub(old_entry.size_bytes as u64);
            if old_key != key {
                state.stats.evictions += 1;
            }
        }
        state.stats.size_bytes += size;
        state.stats.entry_count = state.cache.len();
        Ok(())
    }

    async fn remove(&self, key: &str) -> WardenResult<bool> {
        Ok(self.state.lock().await.pop(key).is_some())
    }

    async fn clear(&self, pattern: Option<&str>) -> WardenResult<usize> {
        let mut state = self.state.lock().await;
        let keys: Vec<String> = state
            .cache
            .iter()
            .filter(|(key, _)| matches(key, pattern))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            state.pop(key);
        }
        Ok(keys.len())
    }

    async fn entries(&self) -> WardenResult<Vec<(String, CacheEntry)>> {
        let state = self.state.lock().await;
        Ok(state
            .cache
            .iter()
            .filter(|(_, entry)| !entry.is_expired())
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect())
    }

    async fn statistics(&self) -> WardenResult<StorageStatistics> {
        Ok(self.state.lock().await.stats.clone())
    }

    async fn cleanup_expired(&self) -> WardenResult<usize> {
        let mut state = self.state.lock().await;
        let expired: Vec<String> = state
            .cache
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            state.pop(key);
            state.stats.evictions += 1;
        }
        Ok(expired.len())
    }
}
