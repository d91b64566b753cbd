//! Sandboxed execution of untrusted code
//!
//! Backends share one capability, [`SandboxBackend`]: report availability and
//! run a code string under limits. The [`SandboxOrchestrator`] holds an ordered
//! preference list, validates code with the policy engine before dispatch, and
//! writes an audit entry for every attempt.

pub mod audit;
mod availability;
pub mod backends;
mod config;
mod limits;
mod orchestrator;
mod process;
mod tenant;
mod types;

#[cfg(test)]
mod tests;

pub use audit::{AuditEntry, AuditLog, ComplianceReport, GovernanceReport};
pub use availability::AvailabilityCheck;
pub use backends::{
    ContainerBackend, MicroVmBackend, ResourceLimitedBackend, WasmBackend, build_backends,
};
pub use config::SandboxConfig;
pub use limits::ResourceLimits;
pub use orchestrator::SandboxOrchestrator;
pub use tenant::TenantContexts;
pub use types::{BackendKind, ExecutionRequest, ExecutionResult, ExecutionStatus};

use async_trait::async_trait;
use std::time::Duration;

/// Result type for sandbox operations
pub type SandboxResult<T> = Result<T, SandboxError>;

/// Errors raised inside a backend before they are classified into a status
#[derive(Debug, Clone, thiserror::Error)]
pub enum SandboxError {
    /// Resource limit exceeded
    #[error("Resource limit exceeded: {resource} ({current}/{limit})")]
    ResourceLimitExceeded {
        resource: String,
        current: u64,
        limit: u64,
    },

    /// Execution timeout
    #[error("Sandbox execution timeout after {0:?}")]
    Timeout(Duration),

    /// Backend cannot run on this host
    #[error("Sandbox backend unavailable: {0}")]
    Unavailable(String),

    /// Sandbox initialization failed
    #[error("Sandbox initialization failed: {0}")]
    InitializationFailed(String),

    /// Process spawn failed
    #[error("Failed to spawn sandboxed process: {0}")]
    SpawnFailed(String),

    /// Filesystem staging failed
    #[error("Sandbox IO error: {0}")]
    Io(String),

    /// Internal error
    #[error("Sandbox internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for SandboxError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// One isolation technology able to run a code string under limits
///
/// `execute` never fails: internal faults come back as
/// [`ExecutionStatus::Error`] with a redacted message.
#[async_trait]
pub trait SandboxBackend: Send + Sync {
    /// Which variant this backend is
    fn kind(&self) -> BackendKind;

    /// Whether this backend can run code on this host
    async fn available(&self) -> bool;

    /// Run `request.code` under the request's limits
    async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult;
}
