//! Tests for the metrics collector

use super::*;
use crate::config::TelemetryConfig;
use crate::telemetry::metrics::MetricValue;
use crate::telemetry::sink::{MetricsSink, names};

#[test]
fn test_collector_creation() {
    let collector = MetricsCollector::new();
    assert_eq!(collector.cache_hits.get(), 0);
    assert_eq!(collector.executions.total(), 0);
    assert_eq!(collector.get_last(names::TOKENS_USED), None);
}

#[test]
fn test_record_tokens_tracks_cost() {
    let collector = MetricsCollector::new();

    collector.record_tokens(100);
    collector.record_tokens(300);

    assert_eq!(collector.tokens_used.get_data().count, 2);
    assert_eq!(collector.get_last(names::TOKENS_USED), Some(300.0));
    assert!((collector.estimated_cost.get() - 0.004).abs() < 1e-9);
}

#[test]
fn test_configured_price() {
    let config = TelemetryConfig {
        cost_per_token: 0.001,
        ..Default::default()
    };
    let collector = MetricsCollector::from_config(&config);
    collector.record_tokens(10);
    assert!((collector.estimated_cost.get() - 0.01).abs() < 1e-9);
}

#[test]
fn test_cache_metrics() {
    let collector = MetricsCollector::new();

    collector.record_cache_hit();
    collector.record_cache_hit();
    collector.record_cache_miss();

    assert_eq!(collector.cache_hits.get(), 2);
    assert_eq!(collector.cache_misses.get(), 1);
    assert!((collector.cache_hit_rate() - 0.666).abs() < 0.01);
}

#[test]
fn test_sink_dispatch() {
    let collector = MetricsCollector::new();
    let sink: &dyn MetricsSink = &collector;

    sink.increment(names::ERRORS, &[("type", "timeout")]);
    sink.increment(names::SANDBOX_REJECTIONS, &[("reason", "unauthorized_import")]);
    sink.increment(names::EXECUTIONS, &[("intent", "list_errors"), ("status", "success")]);
    sink.increment(names::SANDBOX_TIMEOUTS, &[]);
    sink.increment("not_a_metric", &[]);
    sink.observe(names::EXECUTION_DURATION_SECONDS, 0.25);
    sink.set_gauge(names::ACTIVE_SESSIONS, 3.0);

    assert_eq!(collector.errors.get(["timeout"]), 1);
    assert_eq!(collector.sandbox_rejections.get(["unauthorized_import"]), 1);
    assert_eq!(collector.executions.get(["list_errors", "success"]), 1);
    assert_eq!(collector.sandbox_timeouts.get(), 1);
    assert_eq!(collector.get_last(names::EXECUTION_DURATION_SECONDS), Some(0.25));
    assert_eq!(collector.get_last(names::ACTIVE_SESSIONS), Some(3.0));
}

#[test]
fn test_missing_label_is_unknown() {
    let collector = MetricsCollector::new();
    collector.increment(names::ERRORS, &[]);
    assert_eq!(collector.errors.get(["unknown"]), 1);
}

#[test]
fn test_snapshot() {
    let collector = MetricsCollector::new();

    collector.record_execution("analyze", "success", 0.5);
    collector.record_tokens(120);
    collector.errors.inc(["sandbox_error"]);

    let snapshot = collector.snapshot();
    assert_eq!(snapshot.total_executions(), 1);
    assert_eq!(snapshot.executions.get("analyze/success"), Some(&1));
    assert_eq!(snapshot.total_errors(), 1);
    assert!((snapshot.avg_tokens() - 120.0).abs() < 0.001);

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["errors"]["sandbox_error"], 1);
}

#[test]
fn test_alerts() {
    let collector = MetricsCollector::new().with_thresholds(AlertThresholds {
        max_errors: 1,
        min_cache_hit_rate: 0.5,
        max_avg_tokens: 100.0,
    });
    assert!(collector.alerts().is_empty());

    collector.errors.inc_by(["x"], 2);
    collector.record_cache_miss();
    collector.record_tokens(500);

    let alerts = collector.alerts();
    assert_eq!(alerts.len(), 3);
    assert!(matches!(alerts[0], Alert::HighErrorCount { errors: 2, limit: 1 }));
    assert!(matches!(alerts[1], Alert::LowCacheHitRate { .. }));
    assert!(alerts[2].to_string().contains("High token usage"));
}

#[test]
fn test_reset() {
    let collector = MetricsCollector::new();

    collector.record_execution("analyze", "success", 0.5);
    collector.record_cache_hit();
    collector.reset();

    assert_eq!(collector.executions.total(), 0);
    assert_eq!(collector.cache_hits.get(), 0);
    assert_eq!(collector.get_last(names::EXECUTION_DURATION_SECONDS), None);
}

#[test]
fn test_readings_cover_every_metric() {
    let collector = MetricsCollector::new();
    collector.record_tokens(400);
    collector.set_gauge(names::ACTIVE_SESSIONS, 2.0);
    collector.increment(names::ERRORS, &[("type", "timeout")]);

    let readings = collector.readings();
    assert_eq!(readings.len(), 13);
    assert_eq!(readings[names::ACTIVE_SESSIONS], MetricValue::Gauge { value: 2.0 });
    assert_eq!(readings[names::ERRORS].scalar(), 1.0);
    assert_eq!(readings[names::TOKENS_USED].scalar(), 400.0);

    collector.reset();
    assert!(collector.readings().values().all(|value| value.scalar() == 0.0));
}

#[test]
fn test_summary() {
    let collector = MetricsCollector::new();

    collector.record_execution("analyze", "success", 0.5);
    collector.record_cache_hit();

    let summary = collector.summary();
    assert!(summary.contains("Executions: 1 total"));
    assert!(summary.contains("Cache: 100.0% hit rate"));
}

