//! Governance summary: usage distributions, live metrics and audit posture

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::entry::AuditEntry;
use super::report::ComplianceReport;
use crate::telemetry::{
    CODE_EXECUTION_MODE, Distribution, MetricValue, TOOL_ROUTE_MODE, UsageLog, UsagePercentiles,
};

/// Days audit files are expected to be kept before rotation
pub const AUDIT_RETENTION_DAYS: u32 = 90;

const ANONYMIZATION: &str = "Code stored as SHA-256 digest; outputs redacted before persistence";

#[derive(Debug, Clone, Serialize)]
pub struct DataSources {
    pub usage_log: Option<PathBuf>,
    pub audit_directory: Option<PathBuf>,
    pub total_operations_tracked: usize,
}

/// Code execution measured against the tool route
///
/// Each figure is `None` until both modes have samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModeComparison {
    /// Percent fewer tokens per request on code execution
    pub avg_token_reduction_pct: Option<f64>,
    /// Tool-route mean latency divided by code-execution mean latency
    pub avg_latency_ratio: Option<f64>,
}

impl ModeComparison {
    fn from_modes(by_mode: &BTreeMap<String, UsagePercentiles>) -> Self {
        let (Some(tools), Some(code)) = (by_mode.get(TOOL_ROUTE_MODE), by_mode.get(CODE_EXECUTION_MODE))
        else {
            return Self::default();
        };
        let mean = |dist: &Option<Distribution>| dist.as_ref().map(|d| d.mean);

        let avg_token_reduction_pct = match (mean(&tools.tokens), mean(&code.tokens)) {
            (Some(tool_avg), Some(code_avg)) if tool_avg > 0.0 => {
                Some((tool_avg - code_avg) / tool_avg * 100.0)
            }
            _ => None,
        };
        let avg_latency_ratio = match (mean(&tools.latency_ms), mean(&code.latency_ms)) {
            (Some(tool_avg), Some(code_avg)) if code_avg > 0.0 => Some(tool_avg / code_avg),
            _ => None,
        };

        Self {
            avg_token_reduction_pct,
            avg_latency_ratio,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifiedMetrics {
    pub by_mode: BTreeMap<String, UsagePercentiles>,
    pub comparison: ModeComparison,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditTrail {
    pub log_location: Option<PathBuf>,
    pub retention_days: u32,
    pub anonymization: &'static str,
    pub compliance: ComplianceReport,
}

/// Report for a governance review, built from recorded data only
#[derive(Debug, Clone, Serialize)]
pub struct GovernanceReport {
    pub report_timestamp: DateTime<Utc>,
    /// Whether usage records are persisted
    pub telemetry_enabled: bool,
    pub data_sources: DataSources,
    pub verified_metrics: VerifiedMetrics,
    /// Current reading of every in-process metric, when a collector is attached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<BTreeMap<String, MetricValue>>,
    pub audit_trail: AuditTrail,
}

impl GovernanceReport {
    pub fn new(usage: &UsageLog, entries: &[AuditEntry], audit_directory: Option<&Path>) -> Self {
        let by_mode = usage.percentiles_by_mode();
        let comparison = ModeComparison::from_modes(&by_mode);

        Self {
            report_timestamp: Utc::now(),
            telemetry_enabled: usage.path().is_some(),
            data_sources: DataSources {
                usage_log: usage.path().map(Path::to_path_buf),
                audit_directory: audit_directory.map(Path::to_path_buf),
                total_operations_tracked: usage.percentiles().sample_size,
            },
            verified_metrics: VerifiedMetrics {
                by_mode,
                comparison,
            },
            metrics: None,
            audit_trail: AuditTrail {
                log_location: audit_directory.map(Path::to_path_buf),
                retention_days: AUDIT_RETENTION_DAYS,
                anonymization: ANONYMIZATION,
                compliance: ComplianceReport::from_entries(entries),
            },
        }
    }

    pub fn with_metrics(mut self, readings: BTreeMap<String, MetricValue>) -> Self {
        self.metrics = Some(readings);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::TokenUsage;

    fn usage(mode: &str, tokens: u64, latency_ms: f64) -> TokenUsage {
        TokenUsage::new("op", mode, tokens, 0, latency_ms)
    }

    #[test]
    fn test_comparison_needs_both_modes() {
        let log = UsageLog::in_memory();
        log.record(usage(CODE_EXECUTION_MODE, 100, 10.0)).unwrap();

        let report = GovernanceReport::new(&log, &[], None);
        assert_eq!(report.verified_metrics.comparison, ModeComparison::default());
        assert_eq!(report.data_sources.total_operations_tracked, 1);
        assert!(!report.telemetry_enabled);
    }

    #[test]
    fn test_comparison_from_recorded_means() {
        let log = UsageLog::in_memory();
        log.record(usage(TOOL_ROUTE_MODE, 1000, 40.0)).unwrap();
        log.record(usage(TOOL_ROUTE_MODE, 3000, 60.0)).unwrap();
        log.record(usage(CODE_EXECUTION_MODE, 200, 25.0)).unwrap();

        let report = GovernanceReport::new(&log, &[], Some(Path::new("/var/audit")));
        let comparison = &report.verified_metrics.comparison;
        assert!((comparison.avg_token_reduction_pct.unwrap() - 90.0).abs() < 1e-9);
        assert!((comparison.avg_latency_ratio.unwrap() - 2.0).abs() < 1e-9);
        assert_eq!(report.verified_metrics.by_mode[TOOL_ROUTE_MODE].sample_size, 2);
        assert_eq!(report.audit_trail.retention_days, AUDIT_RETENTION_DAYS);
        assert_eq!(
            report.audit_trail.log_location.as_deref(),
            Some(Path::new("/var/audit"))
        );
    }

    #[test]
    fn test_metrics_section_only_when_attached() {
        let log = UsageLog::in_memory();
        let plain = serde_json::to_value(GovernanceReport::new(&log, &[], None)).unwrap();
        assert!(plain.get("metrics").is_none());
        assert_eq!(plain["audit_trail"]["compliance"]["audit_summary"]["total_executions"], 0);

        let readings = BTreeMap::from([("tokens_used".to_string(), MetricValue::Counter { total: 7 })]);
        let with = serde_json::to_value(GovernanceReport::new(&log, &[], None).with_metrics(readings))
            .unwrap();
        assert_eq!(with["metrics"]["tokens_used"]["kind"], "counter");
        assert_eq!(with["metrics"]["tokens_used"]["total"], 7);
    }
}
