//! Cache types and data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::config::warden_home;

/// Storage backend behind the context manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// Bounded in-process LRU map
    #[default]
    Memory,
    /// One JSON file per key under a directory
    Disk,
}

impl CacheBackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Disk => "disk",
        }
    }
}

impl fmt::Display for CacheBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "disk" => Ok(Self::Disk),
            "redis" => Err("redis cache backend is not supported, use memory or disk".to_string()),
            other => Err(format!("unknown cache backend '{}'", other)),
        }
    }
}

/// Cache configuration
///
/// Entry TTL and the per-entry size ceiling come from the feature flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,
    /// Entries kept by the memory backend before LRU eviction
    pub memory_capacity: usize,
    /// Directory for the disk backend
    pub disk_dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Memory,
            memory_capacity: 1000,
            disk_dir: warden_home().join("cache"),
        }
    }
}

/// Cached value with its expiry metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: Value,
    pub created_at: DateTime<Utc>,
    /// None means the entry never expires
    pub expires_at: Option<DateTime<Utc>>,
    /// Length of `data` serialized as JSON
    pub size_bytes: usize,
    pub access_count: u64,
    pub last_accessed: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(data: Value, ttl: Option<Duration>) -> Self {
        let now = Utc::now();
        let expires_at = ttl
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .and_then(|ttl| now.checked_add_signed(ttl));
        let size_bytes = serialized_size(&data);

        Self {
            data,
            created_at: now,
            expires_at,
            size_bytes,
            access_count: 0,
            last_accessed: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires_at| Utc::now() > expires_at)
    }

    pub fn mark_accessed(&mut self) {
        self.access_count += 1;
        self.last_accessed = Utc::now();
    }
}

/// Byte length of a value serialized as JSON
pub fn serialized_size(value: &Value) -> usize {
    serde_json::to_vec(value)
        .map(|bytes| bytes.len())
        .unwrap_or(usize::MAX)
}

/// Per-backend counters
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageStatistics {
    pub entry_count: usize,
    pub size_bytes: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Size report returned by [`ContextManager::get_size`](super::ContextManager::get_size)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheSize {
    pub backend: CacheBackendKind,
    pub entries: usize,
    pub total_bytes: u64,
    pub total_kb: f64,
    /// Per-entry ceiling
    pub limit_kb: u64,
}

/// Deterministic key for an intent and its parameters
///
/// SHA-256 hex of the JSON `{"intent": .., "params": ..}` with object keys
/// sorted at every level, so parameter order never changes the key.
pub fn cache_key(intent: &str, params: &Value) -> String {
    let mut root = Map::new();
    root.insert("intent".to_string(), Value::String(intent.to_string()));
    root.insert("params".to_string(), canonical(params));
    let encoded = serde_json::to_string(&Value::Object(root)).unwrap_or_default();
    let digest = Sha256::digest(encoded.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonical(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}
