//! Core metrics collector implementation

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::alerts::{Alert, AlertThresholds};
use super::types::MetricsSnapshot;
use crate::config::TelemetryConfig;
use crate::telemetry::metrics::{Counter, Gauge, Histogram, LabeledCounter, Metric, MetricValue};
use crate::telemetry::sink::{MetricsSink, label, names};

/// Default price of one token in dollars
const DEFAULT_COST_PER_TOKEN: f64 = 0.00001;

/// In-process store for every named metric
#[derive(Debug)]
pub struct MetricsCollector {
    // Tokens and cost
    pub tokens_used: Histogram,
    pub token_limit_exceeded: Counter,
    pub estimated_cost: Gauge,

    // Executions
    pub execution_duration: Histogram,
    pub executions: LabeledCounter<2>,
    pub errors: LabeledCounter<1>,
    pub sandbox_rejections: LabeledCounter<1>,
    pub sandbox_timeouts: Counter,
    pub memory_limit_exceeded: Counter,

    // Cache
    pub cache_hits: Counter,
    pub cache_misses: Counter,

    // Sessions
    pub active_sessions: Gauge,
    pub context_size_bytes: Gauge,

    cost_per_token: f64,
    thresholds: AlertThresholds,
    started_at: DateTime<Utc>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            tokens_used: Histogram::with_buckets(
                names::TOKENS_USED,
                "Tokens used per request",
                vec![10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 10000.0],
            ),
            token_limit_exceeded: Counter::new(
                names::TOKEN_LIMIT_EXCEEDED,
                "Requests rejected by the token limit",
            ),
            estimated_cost: Gauge::new(names::ESTIMATED_COST, "Estimated cost in dollars"),

            execution_duration: Histogram::new(
                names::EXECUTION_DURATION_SECONDS,
                "Execution duration",
            ),
            executions: LabeledCounter::new(
                names::EXECUTIONS,
                "Executions by intent and status",
                ["intent", "status"],
            ),
            errors: LabeledCounter::new(names::ERRORS, "Errors by type", ["type"]),
            sandbox_rejections: LabeledCounter::new(
                names::SANDBOX_REJECTIONS,
                "Sandbox rejections by reason",
                ["reason"],
            ),
            sandbox_timeouts: Counter::new(names::SANDBOX_TIMEOUTS, "Sandbox timeouts"),
            memory_limit_exceeded: Counter::new(
                names::MEMORY_LIMIT_EXCEEDED,
                "Executions that hit the memory limit",
            ),

            cache_hits: Counter::new(names::CACHE_HITS, "Cache hits"),
            cache_misses: Counter::new(names::CACHE_MISSES, "Cache misses"),

            active_sessions: Gauge::new(names::ACTIVE_SESSIONS, "Currently active sessions"),
            context_size_bytes: Gauge::new(
                names::CONTEXT_SIZE_BYTES,
                "Current context size in bytes",
            ),

            cost_per_token: DEFAULT_COST_PER_TOKEN,
            thresholds: AlertThresholds::default(),
            started_at: Utc::now(),
        }
    }

    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self {
            cost_per_token: config.cost_per_token,
            thresholds: AlertThresholds::from(config),
            ..Self::new()
        }
    }

    pub fn with_thresholds(mut self, thresholds: AlertThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Record the tokens of one request and the cost they incurred
    pub fn record_tokens(&self, tokens: u64) {
        self.tokens_used.observe(tokens as f64);
        self.estimated_cost.add(tokens as f64 * self.cost_per_token);
    }

    pub fn record_execution(&self, intent: &str, status: &str, duration_secs: f64) {
        self.executions.inc([intent, status]);
        self.execution_duration.observe(duration_secs);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.inc();
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.inc();
    }

    /// Most recent observation of a histogram, or the current value of a gauge
    pub fn get_last(&self, name: &str) -> Option<f64> {
        match name {
            names::TOKENS_USED => self.tokens_used.last(),
            names::EXECUTION_DURATION_SECONDS => self.execution_duration.last(),
            names::ACTIVE_SESSIONS => Some(self.active_sessions.get()),
            names::CONTEXT_SIZE_BYTES => Some(self.context_size_bytes.get()),
            names::ESTIMATED_COST => Some(self.estimated_cost.get()),
            _ => None,
        }
    }

    pub fn cache_hit_rate(&self) -> f64 {
        let hits = self.cache_hits.get();
        let total = hits + self.cache_misses.get();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            uptime_seconds: (Utc::now() - self.started_at).num_seconds().max(0) as u64,

            tokens_used: self.tokens_used.get_data(),
            token_limit_exceeded: self.token_limit_exceeded.get(),
            estimated_cost: self.estimated_cost.get(),

            execution_duration: self.execution_duration.get_data(),
            executions: self.executions.to_map(),
            errors: self.errors.to_map(),
            sandbox_rejections: self.sandbox_rejections.to_map(),
            sandbox_timeouts: self.sandbox_timeouts.get(),
            memory_limit_exceeded: self.memory_limit_exceeded.get(),

            cache_hits: self.cache_hits.get(),
            cache_misses: self.cache_misses.get(),
            cache_hit_rate: self.cache_hit_rate(),

            active_sessions: self.active_sessions.get(),
            context_size_bytes: self.context_size_bytes.get(),
        }
    }

    /// Threshold breaches, each also logged at `warn`
    pub fn alerts(&self) -> Vec<Alert> {
        let alerts = self.thresholds.check(&self.snapshot());
        for alert in &alerts {
            warn!("Metrics alert: {}", alert);
        }
        alerts
    }

    /// Every named metric, in export order
    fn metrics(&self) -> [&dyn Metric; 13] {
        [
            &self.tokens_used,
            &self.token_limit_exceeded,
            &self.estimated_cost,
            &self.execution_duration,
            &self.executions,
            &self.errors,
            &self.sandbox_rejections,
            &self.sandbox_timeouts,
            &self.memory_limit_exceeded,
            &self.cache_hits,
            &self.cache_misses,
            &self.active_sessions,
            &self.context_size_bytes,
        ]
    }

    /// Current reading of every metric keyed by metric name
    pub fn readings(&self) -> BTreeMap<String, MetricValue> {
        self.metrics()
            .iter()
            .map(|metric| (metric.name().to_string(), metric.value()))
            .collect()
    }

    pub fn reset(&self) {
        for metric in self.metrics() {
            metric.reset();
        }
    }

    /// Human-readable summary
    pub fn summary(&self) -> String {
        let snapshot = self.snapshot();

        format!(
            "Metrics Summary (uptime: {}s)\n\
             Executions: {} total, {} timeouts, {} rejections, {:.3}s avg\n\
             Tokens: {} requests, {:.0} avg, {} over limit, ${:.4} estimated\n\
             Cache: {:.1}% hit rate ({} hits / {} misses)\n\
             Sessions: {} active\n\
             Errors: {}",
            snapshot.uptime_seconds,
            snapshot.total_executions(),
            snapshot.sandbox_timeouts,
            snapshot.sandbox_rejections.values().sum::<u64>(),
            snapshot.execution_duration.mean(),
            snapshot.tokens_used.count,
            snapshot.avg_tokens(),
            snapshot.token_limit_exceeded,
            snapshot.estimated_cost,
            snapshot.cache_hit_rate * 100.0,
            snapshot.cache_hits,
            snapshot.cache_misses,
            snapshot.active_sessions,
            snapshot.total_errors(),
        )
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSink for MetricsCollector {
    fn increment(&self, name: &str, labels: &[(&str, &str)]) {
        match name {
            names::CACHE_HITS => self.cache_hits.inc(),
            names::CACHE_MISSES => self.cache_misses.inc(),
            names::ERRORS => self.errors.inc([label(labels, "type")]),
            names::SANDBOX_REJECTIONS => self.sandbox_rejections.inc([label(labels, "reason")]),
            names::SANDBOX_TIMEOUTS => self.sandbox_timeouts.inc(),
            names::TOKEN_LIMIT_EXCEEDED => self.token_limit_exceeded.inc(),
            names::MEMORY_LIMIT_EXCEEDED => self.memory_limit_exceeded.inc(),
            names::EXECUTIONS => self
                .executions
                .inc([label(labels, "intent"), label(labels, "status")]),
            other => debug!("Ignoring increment of unknown metric {}", other),
        }
    }

    fn observe(&self, name: &str, value: f64) {
        match name {
            names::TOKENS_USED => self.record_tokens(value.max(0.0) as u64),
            names::EXECUTION_DURATION_SECONDS => self.execution_duration.observe(value),
            other => debug!("Ignoring observation of unknown metric {}", other),
        }
    }

    fn set_gauge(&self, name: &str, value: f64) {
        match name {
            names::ACTIVE_SESSIONS => self.active_sessions.set(value),
            names::CONTEXT_SIZE_BYTES => self.context_size_bytes.set(value),
            other => debug!("Ignoring gauge {} for unknown metric", other),
        }
    }
}
