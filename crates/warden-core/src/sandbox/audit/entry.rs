//! One audit record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::sandbox::types::{ExecutionResult, ExecutionStatus};

/// Immutable record of one execution attempt
///
/// Serialized as one JSON object per line; field names are consumed by
/// compliance tooling and must stay stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub execution_id: String,
    pub timestamp: DateTime<Utc>,
    pub tenant_id: Option<String>,
    pub session_id: Option<String>,
    pub code_hash: String,
    pub policy_version: String,
    pub status: ExecutionStatus,
    pub sandbox_used: String,
    pub duration_ms: u64,
}

impl AuditEntry {
    /// Entry for a finished attempt; the code itself is stored only as a hash
    pub fn for_result(
        code: &str,
        tenant_id: Option<&str>,
        session_id: Option<&str>,
        policy_version: &str,
        result: &ExecutionResult,
    ) -> Self {
        Self {
            execution_id: result.execution_id.clone(),
            timestamp: Utc::now(),
            tenant_id: tenant_id.map(str::to_string),
            session_id: session_id.map(str::to_string),
            code_hash: code_hash(code),
            policy_version: policy_version.to_string(),
            status: result.status,
            sandbox_used: result.sandbox_label().to_string(),
            duration_ms: result.duration_ms,
        }
    }
}

/// SHA-256 hex digest of the submitted code
pub fn code_hash(code: &str) -> String {
    let digest = Sha256::digest(code.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
