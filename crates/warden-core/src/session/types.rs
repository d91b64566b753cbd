//! Session configuration and reporting types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Session manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Lifetime of an idle session, in seconds
    pub default_ttl_secs: u64,
    /// Live sessions kept before the least recently used one is evicted
    pub max_sessions: usize,
    /// Ceiling on a session's serialized context, in KiB
    pub max_session_size_kb: u64,
    /// How often the reaper scans for expired sessions
    #[serde(with = "humantime_serde")]
    pub reaper_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 3600,
            max_sessions: 100,
            max_session_size_kb: 100,
            reaper_interval: Duration::from_secs(60),
        }
    }
}

impl SessionConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn max_session_size_bytes(&self) -> usize {
        (self.max_session_size_kb as usize).saturating_mul(1024)
    }
}

/// Listing entry for a live session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionInfo {
    pub session_id: String,
    pub owner: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    /// Seconds left before the session expires
    pub ttl_remaining: u64,
    pub size_kb: f64,
    pub access_count: u64,
}

/// Aggregate manager statistics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionStats {
    pub active_sessions: usize,
    pub max_sessions: usize,
    pub total_size_kb: f64,
    pub unique_owners: usize,
    pub oldest_session: Option<DateTime<Utc>>,
    /// Sessions the reaper last found above the size ceiling
    pub flagged_sessions: usize,
}

/// Serializable copy of a session for backup and restore
///
/// Every field but the context is optional on input so hand-written
/// snapshots restore cleanly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub session_id: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub last_accessed: DateTime<Utc>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub context: Map<String, Value>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub access_count: u64,
    #[serde(default)]
    pub size_bytes: usize,
}
