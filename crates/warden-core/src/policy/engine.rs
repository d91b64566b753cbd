//! Policy engine: loading, reloading and static validation

use chrono::{DateTime, Utc};
use ed25519_dalek::VerifyingKey;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::PolicyError;
use super::document::{ExecutionPolicy, PolicyLimits};
use super::imports::{collect_imports, is_import_allowed};
use super::signing::{decode_verifying_key, verify_policy_signature};
use crate::config::PolicyConfig;

/// Maximum validation records kept in memory
const MAX_TRAIL_RECORDS: usize = 10_000;

/// A single reason for rejecting code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    BlockedOperation(String),
    UnauthorizedImport(String),
    SyntaxError(String),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlockedOperation(token) => write!(f, "Blocked operation: {}", token),
            Self::UnauthorizedImport(module) => write!(f, "Unauthorized import: {}", module),
            Self::SyntaxError(detail) => write!(f, "Syntax error: {}", detail),
        }
    }
}

impl Violation {
    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BlockedOperation(_) => "blocked_operation",
            Self::UnauthorizedImport(_) => "unauthorized_import",
            Self::SyntaxError(_) => "syntax_error",
        }
    }
}

/// Result of validating one code string
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub approved: bool,
    /// All violations joined with `"; "`
    pub violation_reason: Option<String>,
    pub violations: Vec<Violation>,
}

impl ValidationOutcome {
    fn from_violations(violations: Vec<Violation>) -> Self {
        if violations.is_empty() {
            return Self {
                approved: true,
                violation_reason: None,
                violations,
            };
        }
        let reason = violations
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            approved: false,
            violation_reason: Some(reason),
            violations,
        }
    }
}

/// In-memory record of one validation call, kept for compliance reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub violations: Vec<String>,
    pub approved: bool,
}

/// Validates code against the active execution policy
pub struct PolicyEngine {
    path: Option<PathBuf>,
    trusted_key: Option<VerifyingKey>,
    allow_unsigned: bool,
    policy: RwLock<Arc<ExecutionPolicy>>,
    trail: Mutex<VecDeque<ValidationRecord>>,
}

impl PolicyEngine {
    /// Engine over an in-memory policy with no backing file
    pub fn new(policy: ExecutionPolicy) -> Self {
        Self {
            path: None,
            trusted_key: None,
            allow_unsigned: false,
            policy: RwLock::new(Arc::new(policy)),
            trail: Mutex::new(VecDeque::new()),
        }
    }

    /// Load the policy named by `config`
    ///
    /// A missing file yields the built-in default policy. A present file must
    /// carry a signature that verifies against the configured key unless
    /// unsigned policies are explicitly allowed.
    pub fn load(config: &PolicyConfig) -> Result<Self, PolicyError> {
        let trusted_key = config
            .trusted_key
            .as_deref()
            .map(decode_verifying_key)
            .transpose()?;
        let policy = read_policy(&config.path, trusted_key.as_ref(), config.allow_unsigned)?;
        info!(
            "Loaded execution policy version {} from {:?}",
            policy.version, config.path
        );
        Ok(Self {
            path: Some(config.path.clone()),
            trusted_key,
            allow_unsigned: config.allow_unsigned,
            policy: RwLock::new(Arc::new(policy)),
            trail: Mutex::new(VecDeque::new()),
        })
    }

    /// Re-read the policy file, re-verifying its signature
    ///
    /// On failure the previously loaded policy stays active.
    pub fn reload(&self) -> Result<(), PolicyError> {
        let Some(path) = &self.path else {
            debug!("Policy engine has no backing file, reload skipped");
            return Ok(());
        };
        let policy = read_policy(path, self.trusted_key.as_ref(), self.allow_unsigned)?;
        info!("Reloaded execution policy version {}", policy.version);
        *self.policy.write() = Arc::new(policy);
        Ok(())
    }

    /// The active policy
    pub fn policy(&self) -> Arc<ExecutionPolicy> {
        Arc::clone(&self.policy.read())
    }

    /// Version string of the active policy
    pub fn version(&self) -> String {
        self.policy.read().version.clone()
    }

    /// Limits the backend must be configured with
    pub fn get_limits(&self) -> PolicyLimits {
        self.policy.read().limits()
    }

    /// Statically check `code` against the active policy
    ///
    /// Every call is recorded in the in-memory trail, approved or not.
    pub fn validate(&self, code: &str) -> ValidationOutcome {
        let policy = self.policy();
        let mut violations = Vec::new();

        for blocked in &policy.blocked_operations {
            if code.contains(blocked.as_str()) {
                violations.push(Violation::BlockedOperation(blocked.clone()));
            }
        }

        match collect_imports(code) {
            Ok(imports) => {
                for import in imports {
                    if !is_import_allowed(&import, &policy.allowed_imports) {
                        violations.push(Violation::UnauthorizedImport(import.module));
                    }
                }
            }
            Err(e) => violations.push(Violation::SyntaxError(e.to_string())),
        }

        let outcome = ValidationOutcome::from_violations(violations);
        self.record(&outcome);
        if !outcome.approved {
            debug!(
                "Code rejected by policy: {}",
                outcome.violation_reason.as_deref().unwrap_or_default()
            );
        }
        outcome
    }

    fn record(&self, outcome: &ValidationOutcome) {
        let mut trail = self.trail.lock();
        if trail.len() >= MAX_TRAIL_RECORDS {
            trail.pop_front();
        }
        trail.push_back(ValidationRecord {
            timestamp: Utc::now(),
            action: "validate_code".to_string(),
            violations: outcome.violations.iter().map(|v| v.to_string()).collect(),
            approved: outcome.approved,
        });
    }

    /// Copy of the in-memory validation trail, oldest first
    pub fn audit_trail(&self) -> Vec<ValidationRecord> {
        self.trail.lock().iter().cloned().collect()
    }
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new(ExecutionPolicy::default())
    }
}

fn read_policy(
    path: &Path,
    trusted_key: Option<&VerifyingKey>,
    allow_unsigned: bool,
) -> Result<ExecutionPolicy, PolicyError> {
    if !path.exists() {
        info!("No policy file at {:?}, using built-in default policy", path);
        return Ok(ExecutionPolicy::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| PolicyError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let policy: ExecutionPolicy =
        serde_json::from_str(&content).map_err(|e| PolicyError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    match (trusted_key, policy.signature.is_some()) {
        (Some(key), true) => {
            if !verify_policy_signature(&policy, key) {
                return Err(PolicyError::InvalidSignature {
                    path: path.to_path_buf(),
                });
            }
        }
        (Some(_), false) if !allow_unsigned => {
            return Err(PolicyError::MissingSignature {
                path: path.to_path_buf(),
            });
        }
        (None, _) if !allow_unsigned => {
            return Err(PolicyError::NoTrustedKey {
                path: path.to_path_buf(),
            });
        }
        _ => warn!("Accepting unverified policy {:?}", path),
    }

    Ok(policy)
}
