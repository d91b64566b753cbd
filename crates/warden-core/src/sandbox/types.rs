//! Request and result types shared by every backend

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::redact::SecretRedactor;

/// Backend variants, strongest isolation first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Embedded WASI interpreter, no OS process
    Wasm,
    /// Container under a kernel-isolating runtime (gVisor)
    Microvm,
    /// Ephemeral unprivileged container
    Container,
    /// Interpreter process under rlimits
    Process,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wasm => "wasm",
            Self::Microvm => "microvm",
            Self::Container => "container",
            Self::Process => "process",
        }
    }

    /// Default preference order
    pub fn preference() -> Vec<BackendKind> {
        vec![Self::Wasm, Self::Microvm, Self::Container, Self::Process]
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wasm" => Ok(Self::Wasm),
            "microvm" | "gvisor" => Ok(Self::Microvm),
            "container" | "docker" => Ok(Self::Container),
            "process" | "basic" => Ok(Self::Process),
            other => Err(format!("unknown sandbox backend '{}'", other)),
        }
    }
}

/// Outcome category of one execution attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    PolicyViolation,
    SandboxUnavailable,
    Timeout,
    Error,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::PolicyViolation => "policy_violation",
            Self::SandboxUnavailable => "sandbox_unavailable",
            Self::Timeout => "timeout",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One code string to run, with the limits it was validated against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub code: String,
    pub tenant_id: Option<String>,
    pub session_id: Option<String>,
    pub timeout_seconds: u64,
    pub memory_mb: u64,
    #[serde(default)]
    pub network_allowed: bool,
}

impl ExecutionRequest {
    pub fn new(code: impl Into<String>, timeout_seconds: u64, memory_mb: u64) -> Self {
        Self {
            code: code.into(),
            tenant_id: None,
            session_id: None,
            timeout_seconds,
            memory_mb,
            network_allowed: false,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Structured, redacted outcome of one execution attempt
///
/// `status` decides which fields are meaningful: `message` carries the
/// violation reason, timeout description or redacted fault text, while
/// `stdout`/`stderr`/`exit_code` are only populated by backends that ran code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub sandbox_used: Option<BackendKind>,
    pub execution_id: String,
    pub duration_ms: u64,
    pub message: Option<String>,
}

impl ExecutionResult {
    fn empty(status: ExecutionStatus) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            sandbox_used: None,
            execution_id: String::new(),
            duration_ms: 0,
            message: None,
        }
    }

    /// Code ran to completion; a non-zero exit code is still a success
    pub fn completed(
        backend: BackendKind,
        stdout: String,
        stderr: String,
        exit_code: Option<i32>,
    ) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
            sandbox_used: Some(backend),
            ..Self::empty(ExecutionStatus::Success)
        }
    }

    /// Wall-clock limit exceeded and the execution unit was killed
    pub fn timed_out(backend: BackendKind, limit: Duration, stdout: String, stderr: String) -> Self {
        Self {
            stdout,
            stderr,
            sandbox_used: Some(backend),
            message: Some(format!("Execution exceeded the {}s time limit", limit.as_secs())),
            ..Self::empty(ExecutionStatus::Timeout)
        }
    }

    /// Backend fault; the message is redacted before it is stored
    pub fn error(backend: Option<BackendKind>, message: impl AsRef<str>) -> Self {
        Self {
            sandbox_used: backend,
            message: Some(SecretRedactor::redact(message.as_ref())),
            ..Self::empty(ExecutionStatus::Error)
        }
    }

    pub fn policy_violation(reason: impl Into<String>) -> Self {
        Self {
            message: Some(reason.into()),
            ..Self::empty(ExecutionStatus::PolicyViolation)
        }
    }

    pub fn sandbox_unavailable() -> Self {
        Self {
            message: Some("No sandbox backend is available".to_string()),
            ..Self::empty(ExecutionStatus::SandboxUnavailable)
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    /// Label for the backend that ran, `"none"` when nothing ran
    pub fn sandbox_label(&self) -> &'static str {
        self.sandbox_used.map(|k| k.as_str()).unwrap_or("none")
    }
}
