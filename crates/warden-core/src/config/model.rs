//! Configuration data model

use crate::cache::CacheConfig;
use crate::capability::CapabilityConfig;
use crate::error::{WardenError, WardenResult};
use crate::executor::FeatureFlags;
use crate::sandbox::SandboxConfig;
use crate::session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::logging_config::LoggingConfig;

/// Root directory for Warden state (`~/.warden`)
pub fn warden_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".warden")
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub features: FeatureFlags,
    pub policy: PolicyConfig,
    pub sandbox: SandboxConfig,
    pub sessions: SessionConfig,
    pub cache: CacheConfig,
    pub capabilities: CapabilityConfig,
    pub audit: AuditConfig,
    pub telemetry: TelemetryConfig,
    pub logging: LoggingConfig,
}

impl WardenConfig {
    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> WardenResult<()> {
        if self.features.max_tokens_per_request == 0 {
            return Err(WardenError::config_with_context(
                "max_tokens_per_request must be greater than zero",
                "features.max_tokens_per_request",
            ));
        }
        if self.sessions.max_sessions == 0 {
            return Err(WardenError::config_with_context(
                "max_sessions must be greater than zero",
                "sessions.max_sessions",
            ));
        }
        if self.sandbox.preference.is_empty() {
            return Err(WardenError::config_with_context(
                "at least one sandbox backend must be listed",
                "sandbox.preference",
            ));
        }
        Ok(())
    }
}

/// Where the execution policy comes from and how it is verified
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Policy document path
    pub path: PathBuf,
    /// Base64 Ed25519 public key that policy signatures are checked against
    pub trusted_key: Option<String>,
    /// Accept policy files without a valid signature
    pub allow_unsigned: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            path: warden_home().join("policies").join("default.json"),
            trusted_key: None,
            allow_unsigned: false,
        }
    }
}

/// Audit log location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Directory holding the daily `audit_YYYYMMDD.jsonl` files
    pub directory: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            directory: warden_home().join("audit"),
        }
    }
}

/// Telemetry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// JSON-lines token usage log; disabled when unset
    pub usage_log: Option<PathBuf>,
    /// Price of one token, used for the estimated cost gauge
    pub cost_per_token: f64,
    /// Alert when total errors exceed this count
    pub alert_max_errors: u64,
    /// Alert when the cache hit rate falls below this fraction
    pub alert_min_hit_rate: f64,
    /// Alert when the mean tokens per request exceed this value
    pub alert_max_avg_tokens: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            usage_log: None,
            cost_per_token: 0.00001,
            alert_max_errors: 100,
            alert_min_hit_rate: 0.5,
            alert_max_avg_tokens: 5000.0,
        }
    }
}
