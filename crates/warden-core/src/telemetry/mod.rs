//! Metrics and usage telemetry
//!
//! Core components report through the narrow [`MetricsSink`] trait and never
//! depend on a metrics backend. [`MetricsCollector`] is the in-process
//! implementation; [`NoopMetrics`] stands in when metrics are disabled.

pub mod collector;
pub mod metrics;
mod sink;
mod usage;

pub use collector::{Alert, AlertThresholds, MetricsCollector, MetricsSnapshot};
pub use metrics::{
    Counter, Gauge, Histogram, HistogramData, LabeledCounter, Metric, MetricValue,
};
pub use sink::{MetricsSink, NoopMetrics, names};
pub use usage::{
    CODE_EXECUTION_MODE, Distribution, TOOL_ROUTE_MODE, TokenUsage, UsageLog, UsagePercentiles,
};
