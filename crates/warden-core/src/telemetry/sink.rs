//! Narrow reporting interface used by the core

use std::fmt;

/// Names understood by [`MetricsSink`] implementations
pub mod names {
    pub const TOKENS_USED: &str = "tokens_used";
    pub const EXECUTION_DURATION_SECONDS: &str = "execution_duration_seconds";
    pub const CACHE_HITS: &str = "cache_hits";
    pub const CACHE_MISSES: &str = "cache_misses";
    /// Labels: `type`
    pub const ERRORS: &str = "errors";
    /// Labels: `reason`
    pub const SANDBOX_REJECTIONS: &str = "sandbox_rejections";
    pub const SANDBOX_TIMEOUTS: &str = "sandbox_timeouts";
    pub const TOKEN_LIMIT_EXCEEDED: &str = "token_limit_exceeded";
    pub const MEMORY_LIMIT_EXCEEDED: &str = "memory_limit_exceeded";
    /// Labels: `intent`, `status`
    pub const EXECUTIONS: &str = "executions";
    pub const ACTIVE_SESSIONS: &str = "active_sessions";
    pub const CONTEXT_SIZE_BYTES: &str = "context_size_bytes";
    pub const ESTIMATED_COST: &str = "estimated_cost";
}

/// Where counters, observations and gauges are reported
pub trait MetricsSink: Send + Sync + fmt::Debug {
    /// Add one to a counter; `labels` are `(name, value)` pairs
    fn increment(&self, name: &str, labels: &[(&str, &str)]);

    /// Record one observation of a distribution
    fn observe(&self, name: &str, value: f64);

    fn set_gauge(&self, name: &str, value: f64);
}

/// Sink that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn increment(&self, _name: &str, _labels: &[(&str, &str)]) {}

    fn observe(&self, _name: &str, _value: f64) {}

    fn set_gauge(&self, _name: &str, _value: f64) {}
}

/// Value of label `key`, or `"unknown"`
pub(crate) fn label<'a>(labels: &[(&str, &'a str)], key: &str) -> &'a str {
    labels
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, value)| *value)
        .unwrap_or("unknown")
}
