//! Context manager: TTL'd key/value cache with a per-entry size ceiling

use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::storage::{CacheStorage, DiskStorage, MemoryStorage};
use super::types::{CacheBackendKind, CacheConfig, CacheEntry, CacheSize, serialized_size};
use crate::error::WardenResult;

/// Key/value context store with pluggable storage
///
/// Storage failures never surface to callers: reads degrade to a miss and
/// writes report `false`.
#[derive(Debug)]
pub struct ContextManager {
    backend: CacheBackendKind,
    storage: Box<dyn CacheStorage>,
    ttl: Duration,
    size_limit_bytes: usize,
    last_cache_hit: AtomicBool,
}

impl ContextManager {
    /// Build a manager over the configured backend
    ///
    /// Every entry lives for `ttl`; a single value larger than
    /// `size_limit_kb` is refused.
    pub fn new(config: &CacheConfig, ttl: Duration, size_limit_kb: u64) -> WardenResult<Self> {
        let storage: Box<dyn CacheStorage> = match config.backend {
            CacheBackendKind::Memory => Box::new(MemoryStorage::new(config.memory_capacity)),
            CacheBackendKind::Disk => Box::new(DiskStorage::open(&config.disk_dir)?),
        };
        info!(
            backend = %config.backend,
            ttl_secs = ttl.as_secs(),
            size_limit_kb,
            "Context manager initialized"
        );
        Ok(Self::with_storage(config.backend, storage, ttl, size_limit_kb))
    }

    pub fn with_storage(
        backend: CacheBackendKind,
        storage: Box<dyn CacheStorage>,
        ttl: Duration,
        size_limit_kb: u64,
    ) -> Self {
        Self {
            backend,
            storage,
            ttl,
            size_limit_bytes: (size_limit_kb as usize).saturating_mul(1024),
            last_cache_hit: AtomicBool::new(false),
        }
    }

    /// In-memory manager, mostly for tests and one-shot CLI runs
    pub fn in_memory(ttl: Duration, size_limit_kb: u64) -> Self {
        Self::with_storage(
            CacheBackendKind::Memory,
            Box::new(MemoryStorage::new(1000)),
            ttl,
            size_limit_kb,
        )
    }

    pub fn backend(&self) -> CacheBackendKind {
        self.backend
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        let found = match self.storage.get(key).await {
            Ok(entry) => entry.map(|entry| entry.data),
            Err(e) => {
                error!(key, "Cache read failed: {}", e);
                None
            }
        };
        self.last_cache_hit.store(found.is_some(), Ordering::Relaxed);
        found
    }

    /// Store a value with the manager's TTL
    ///
    /// Returns `false` without touching other entries when the value alone
    /// is larger than the size ceiling.
    pub async fn set(&self, key: &str, value: Value) -> bool {
        let size = serialized_size(&value);
        if size > self.size_limit_bytes {
            warn!(
                key,
                size,
                limit = self.size_limit_bytes,
                "Context value exceeds size limit, not cached"
            );
            return false;
        }

        match self.storage.set(key, CacheEntry::new(value, Some(self.ttl))).await {
            Ok(()) => {
                debug!(key, size, "Context value cached");
                true
            }
            Err(e) => {
                error!(key, "Cache write failed: {}", e);
                false
            }
        }
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.storage.remove(key).await.unwrap_or_else(|e| {
            error!(key, "Cache delete failed: {}", e);
            false
        })
    }

    /// Remove entries whose key contains `pattern`, or everything
    pub async fn clear(&self, pattern: Option<&str>) -> usize {
        let cleared = self.storage.clear(pattern).await.unwrap_or_else(|e| {
            error!("Cache clear failed: {}", e);
            0
        });
        info!(pattern = pattern.unwrap_or("*"), cleared, "Context cleared");
        cleared
    }

    pub async fn get_size(&self) -> CacheSize {
        let stats = self.storage.statistics().await.unwrap_or_default();
        CacheSize {
            backend: self.backend,
            entries: stats.entry_count,
            total_bytes: stats.size_bytes,
            total_kb: stats.size_bytes as f64 / 1024.0,
            limit_kb: (self.size_limit_bytes / 1024) as u64,
        }
    }

    pub async fn cleanup_expired(&self) -> usize {
        self.storage.cleanup_expired().await.unwrap_or_else(|e| {
            error!("Cache cleanup failed: {}", e);
            0
        })
    }

    /// Live entries as a JSON object keyed by cache key
    pub async fn export(&self) -> Map<String, Value> {
        let mut entries = self.storage.entries().await.unwrap_or_else(|e| {
            error!("Cache export failed: {}", e);
            Vec::new()
        });
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
            .into_iter()
            .map(|(key, entry)| (key, entry.data))
            .collect()
    }

    /// Whether the most recent `get` was a hit
    pub fn last_cache_hit(&self) -> bool {
        self.last_cache_hit.load(Ordering::Relaxed)
    }
}
