//! Disk-backed storage: one JSON file per key plus an in-memory index

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{CacheStorage, matches};
use crate::cache::types::{CacheEntry, StorageStatistics};
use crate::error::{WardenError, WardenResult};

/// File contents: the entry together with its original key
#[derive(Debug, Serialize, Deserialize)]
struct DiskRecord {
    key: String,
    entry: CacheEntry,
}

#[derive(Debug, Clone)]
struct IndexEntry {
    path: PathBuf,
    size_bytes: usize,
    expires_at: Option<DateTime<Utc>>,
}

impl IndexEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires_at| Utc::now() > expires_at)
    }
}

#[derive(Debug, Default)]
struct DiskState {
    index: HashMap<String, IndexEntry>,
    stats: StorageStatistics,
}

impl DiskState {
    fn refresh_totals(&mut self) {
        self.stats.entry_count = self.index.len();
        self.stats.size_bytes = self.index.values().map(|e| e.size_bytes as u64).sum();
    }
}

/// Disk-based cache storage
///
/// Writes go to a temporary file that is renamed into place, so readers
/// never observe a partially written entry.
#[derive(Debug)]
pub struct DiskStorage {
    base_dir: PathBuf,
    state: Mutex<DiskState>,
}

fn cache_error(action: &str, path: &Path, err: impl std::fmt::Display) -> WardenError {
    WardenError::cache(format!("Failed to {} '{}': {}", action, path.display(), err))
}

impl DiskStorage {
    /// Open (creating if needed) a storage directory and index its entries
    ///
    /// Expired files are deleted; unreadable ones are skipped.
    pub fn open(base_dir: impl AsRef<Path>) -> WardenResult<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir)
            .map_err(|e| cache_error("create cache directory", &base_dir, e))?;

        let mut state = DiskState::default();
        let entries = std::fs::read_dir(&base_dir)
            .map_err(|e| cache_error("read cache directory", &base_dir, e))?;
        for dir_entry in entries.flatten() {
            let path = dir_entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let record = std::fs::read_to_string(&path)
                .ok()
                .and_then(|content| serde_json::from_str::<DiskRecord>(&content).ok());
            let Some(record) = record else {
                warn!("Skipping unreadable cache file {}", path.display());
                continue;
            };
            if record.entry.is_expired() {
                let _ = std::fs::remove_file(&path);
                continue;
            }
            state.index.insert(
                record.key,
                IndexEntry {
                    path,
                    size_bytes: record.entry.size_bytes,
                    expires_at: record.entry.expires_at,
                },
            );
        }
        state.refresh_totals();
        debug!(
            entries = state.index.len(),
            "Opened disk cache at {}",
            base_dir.display()
        );

        Ok(Self {
            base_dir,
            state: Mutex::new(state),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn file_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        let name: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        self.base_dir.join(format!("{}.json", name))
    }

    async fn read_record(path: &Path) -> Option<DiskRecord> {
        let content = fs::read_to_string(path).await.ok()?;
        serde_json::from_str(&content).ok()
    }

    async fn remove_locked(state: &mut DiskState, key: &str) -> bool {
        match state.index.remove(key) {
            Some(entry) => {
                let _ = fs::remove_file(&entry.path).await;
                state.refresh_totals();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl CacheStorage for DiskStorage {
    async fn get(&self, key: &str) -> WardenResult<Option<CacheEntry>> {
        let mut state = self.state.lock().await;

        let Some(indexed) = state.index.get(key).cloned() else {
            state.stats.misses += 1;
            return Ok(None);
        };
        if indexed.is_expired() {
            Self::remove_locked(&mut state, key).await;
            state.stats.evictions += 1;
            state.stats.misses += 1;
            return Ok(None);
        }

        match Self::read_record(&indexed.path).await {
            Some(record) if record.key == key => {
                let mut entry = record.entry;
                entry.mark_accessed();
                state.stats.hits += 1;
                Ok(Some(entry))
            }
            _ => {
                warn!("Dropping corrupted cache file {}", indexed.path.display());
                Self::remove_locked(&mut state, key).await;
                state.stats.misses += 1;
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> WardenResult<()> {
        let path = self.file_path(key);
        let record = DiskRecord {
            key: key.to_string(),
            entry,
        };
        let content = serde_json::to_vec(&record)?;
        let tmp_path = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4().simple()));

        let mut state = self.state.lock().await;
        fs::write(&tmp_path, &content)
            .await
            .map_err(|e| cache_error("write cache file", &tmp_path, e))?;
        if let Err(e) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(cache_error("replace cache file", &path, e));
        }

        state.index.insert(
            key.to_string(),
            IndexEntry {
                path,
                size_bytes: record.entry.size_bytes,
                expires_at: record.entry.expires_at,
            },
        );
        state.refresh_totals();
        Ok(())
    }

    async fn remove(&self, key: &str) -> WardenResult<bool> {
        let mut state = self.state.lock().await;
        Ok(Self::remove_locked(&mut state, key).await)
    }

    async fn clear(&self, pattern: Option<&str>) -> WardenResult<usize> {
        let mut state = self.state.lock().await;
        let keys: Vec<String> = state
            .index
            .keys()
            .filter(|key| matches(key, pattern))
            .cloned()
            .collect();
        for key in &keys {
            Self::remove_locked(&mut state, key).await;
        }
        Ok(keys.len())
    }

    async fn entries(&self) -> WardenResult<Vec<(String, CacheEntry)>> {
        let state = self.state.lock().await;
        let mut live = Vec::with_capacity(state.index.len());
        for (key, indexed) in &state.index {
            if indexed.is_expired() {
                continue;
            }
            if let Some(record) = Self::read_record(&indexed.path).await {
                live.push((key.clone(), record.entry));
            }
        }
        Ok(live)
    }

    async fn statistics(&self) -> WardenResult<StorageStatistics> {
        Ok(self.state.lock().await.stats.clone())
    }

    async fn cleanup_expired(&self) -> WardenResult<usize> {
        let mut state = self.state.lock().await;
        let expired: Vec<String> = state
            .index
            .iter()
            .filter(|(_, indexed)| indexed.is_expired())
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            Self::remove_locked(&mut state, key).await;
            state.stats.evictions += 1;
        }
        Ok(expired.len())
    }
}
