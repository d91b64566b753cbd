//! Policy document and the limits derived from it

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Filesystem access level granted to executed code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilesystemAccess {
    #[default]
    None,
    ReadOnly,
    ReadWrite,
}

impl fmt::Display for FilesystemAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::ReadOnly => write!(f, "read_only"),
            Self::ReadWrite => write!(f, "read_write"),
        }
    }
}

/// Signed execution policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPolicy {
    pub version: String,
    /// Wall-clock limit in seconds
    pub max_execution_time: u64,
    pub max_memory_mb: u64,
    pub allowed_imports: Vec<String>,
    pub blocked_operations: Vec<String>,
    #[serde(default)]
    pub network_allowed: bool,
    #[serde(default)]
    pub filesystem_access: FilesystemAccess,
    #[serde(default = "default_true")]
    pub require_approval: bool,
    #[serde(default = "default_audit_level")]
    pub audit_level: String,
    /// Base64 Ed25519 signature over [`ExecutionPolicy::canonical_json`]
    #[serde(default)]
    pub signature: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_audit_level() -> String {
    "full".to_string()
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            max_execution_time: 10,
            max_memory_mb: 256,
            allowed_imports: [
                "json",
                "math",
                "datetime",
                "collections",
                "itertools",
                "functools",
                "typing",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            blocked_operations: [
                "exec",
                "eval",
                "__import__",
                "compile",
                "open",
                "file",
                "input",
                "raw_input",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            network_allowed: false,
            filesystem_access: FilesystemAccess::None,
            require_approval: true,
            audit_level: default_audit_level(),
            signature: None,
        }
    }
}

impl ExecutionPolicy {
    /// JSON of the policy without its signature, object keys sorted
    pub fn canonical_json(&self) -> String {
        let mut unsigned = self.clone();
        unsigned.signature = None;
        // serde_json::Value maps are ordered by key
        let mut value = match serde_json::to_value(&unsigned) {
            Ok(value) => value,
            Err(_) => return String::new(),
        };
        if let Some(map) = value.as_object_mut() {
            map.remove("signature");
        }
        value.to_string()
    }

    /// SHA-256 hex digest of the canonical JSON
    pub fn content_digest(&self) -> String {
        let digest = Sha256::digest(self.canonical_json().as_bytes());
        format!("{:x}", digest)
    }

    /// Limits the backends must be configured with
    pub fn limits(&self) -> PolicyLimits {
        PolicyLimits {
            timeout: self.max_execution_time,
            memory_mb: self.max_memory_mb,
            network: self.network_allowed,
            filesystem: self.filesystem_access,
        }
    }
}

/// Resource settings exposed to callers configuring a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyLimits {
    pub timeout: u64,
    pub memory_mb: u64,
    pub network: bool,
    pub filesystem: FilesystemAccess,
}
