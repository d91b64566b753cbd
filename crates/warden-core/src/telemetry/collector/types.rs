//! Serialisable point-in-time view of the collector

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::telemetry::metrics::HistogramData;

/// Serializable copy of every named metric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,

    // Tokens and cost
    pub tokens_used: HistogramData,
    pub token_limit_exceeded: u64,
    pub estimated_cost: f64,

    // Executions
    pub execution_duration: HistogramData,
    /// Keyed by `intent/status`
    pub executions: BTreeMap<String, u64>,
    pub errors: BTreeMap<String, u64>,
    pub sandbox_rejections: BTreeMap<String, u64>,
    pub sandbox_timeouts: u64,
    pub memory_limit_exceeded: u64,

    // Cache
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,

    // Sessions
    pub active_sessions: f64,
    pub context_size_bytes: f64,
}

impl MetricsSnapshot {
    pub fn total_errors(&self) -> u64 {
        self.errors.values().sum()
    }

    pub fn total_executions(&self) -> u64 {
        self.executions.values().sum()
    }

    pub fn avg_tokens(&self) -> f64 {
        self.tokens_used.mean()
    }
}
