//! Threshold checks over a snapshot

use serde::{Deserialize, Serialize};
use std::fmt;

use super::types::MetricsSnapshot;
use crate::config::TelemetryConfig;

/// Limits that trigger an [`Alert`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    pub max_errors: u64,
    pub min_cache_hit_rate: f64,
    pub max_avg_tokens: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            max_errors: 100,
            min_cache_hit_rate: 0.5,
            max_avg_tokens: 5000.0,
        }
    }
}

impl From<&TelemetryConfig> for AlertThresholds {
    fn from(config: &TelemetryConfig) -> Self {
        Self {
            max_errors: config.alert_max_errors,
            min_cache_hit_rate: config.alert_min_hit_rate,
            max_avg_tokens: config.alert_max_avg_tokens,
        }
    }
}

/// A breached threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "alert", rename_all = "snake_case")]
pub enum Alert {
    HighErrorCount { errors: u64, limit: u64 },
    LowCacheHitRate { rate: f64, limit: f64 },
    HighTokenUsage { avg_tokens: f64, limit: f64 },
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HighErrorCount { errors, limit } => {
                write!(f, "High error count: {} (limit {})", errors, limit)
            }
            Self::LowCacheHitRate { rate, limit } => write!(
                f,
                "Low cache hit rate: {:.1}% (limit {:.1}%)",
                rate * 100.0,
                limit * 100.0
            ),
            Self::HighTokenUsage { avg_tokens, limit } => {
                write!(f, "High token usage: {:.0} avg (limit {:.0})", avg_tokens, limit)
            }
        }
    }
}

impl AlertThresholds {
    /// Breaches in `snapshot`; the hit rate is only judged once the cache saw traffic
    pub fn check(&self, snapshot: &MetricsSnapshot) -> Vec<Alert> {
        let mut alerts = Vec::new();

        let errors = snapshot.total_errors();
        if errors > self.max_errors {
            alerts.push(Alert::HighErrorCount {
                errors,
                limit: self.max_errors,
            });
        }

        let lookups = snapshot.cache_hits + snapshot.cache_misses;
        if lookups > 0 && snapshot.cache_hit_rate < self.min_cache_hit_rate {
            alerts.push(Alert::LowCacheHitRate {
                rate: snapshot.cache_hit_rate,
                limit: self.min_cache_hit_rate,
            });
        }

        let avg_tokens = snapshot.avg_tokens();
        if avg_tokens > self.max_avg_tokens {
            alerts.push(Alert::HighTokenUsage {
                avg_tokens,
                limit: self.max_avg_tokens,
            });
        }

        alerts
    }
}
