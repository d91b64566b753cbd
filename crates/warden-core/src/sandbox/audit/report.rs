//! Compliance summary over the audit trail

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::entry::AuditEntry;
use crate::sandbox::types::ExecutionStatus;

/// Controls enforced on every execution and how each is implemented
pub const SECURITY_CONTROLS: &[(&str, &str)] = &[
    ("code_isolation", "WASM/gVisor/container sandboxing with process fallback"),
    ("secret_management", "Automatic output redaction"),
    ("audit_logging", "Complete execution trail"),
    ("policy_enforcement", "Ed25519-signed policy bundles"),
    ("tenant_isolation", "Separate contexts"),
    ("pii_protection", "Hashing and redaction"),
];

/// Counts by outcome
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub total_executions: usize,
    pub policy_violations: usize,
    pub successful_executions: usize,
    pub timeouts: usize,
    pub errors: usize,
    pub sandbox_unavailable: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub compliance_framework: String,
    pub security_controls: BTreeMap<String, String>,
    pub audit_summary: AuditSummary,
    pub generated_at: DateTime<Utc>,
}

impl ComplianceReport {
    pub fn from_entries(entries: &[AuditEntry]) -> Self {
        let mut summary = AuditSummary {
            total_executions: entries.len(),
            ..Default::default()
        };
        for entry in entries {
            match entry.status {
                ExecutionStatus::Success => summary.successful_executions += 1,
                ExecutionStatus::PolicyViolation => summary.policy_violations += 1,
                ExecutionStatus::Timeout => summary.timeouts += 1,
                ExecutionStatus::Error => summary.errors += 1,
                ExecutionStatus::SandboxUnavailable => summary.sandbox_unavailable += 1,
            }
        }

        Self {
            compliance_framework: "SOC2 Type 2".to_string(),
            security_controls: SECURITY_CONTROLS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            audit_summary: summary,
            generated_at: Utc::now(),
        }
    }
}
