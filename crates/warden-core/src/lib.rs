//! Warden Core Library
//!
//! Sandboxed code-execution middleware: a policy engine validates generated
//! code, an orchestrator runs it on the strongest available isolation
//! backend, and every run is redacted, audited and measured. Sessions, a
//! result cache and an intent router backed by a signed capability registry
//! sit in front of execution.

pub mod cache;
pub mod capability;
pub mod config;
pub mod error;
pub mod executor;
pub mod policy;
pub mod redact;
pub mod sandbox;
pub mod session;
pub mod telemetry;

// Re-export commonly used types
pub use cache::{CacheConfig, ContextManager};
pub use capability::{CapabilityProtocol, CapabilityRegistry};
pub use config::{WardenConfig, warden_home};
pub use error::{WardenError, WardenResult};
pub use executor::{CodeExecutor, Envelope, ExecutionMode, FeatureFlags, IntentRouter};
pub use policy::{ExecutionPolicy, PolicyEngine, ValidationOutcome};
pub use redact::SecretRedactor;
pub use sandbox::{
    AuditLog, BackendKind, ExecutionResult, ExecutionStatus, SandboxBackend, SandboxOrchestrator,
};
pub use session::{SessionConfig, SessionManager, SessionProtocol};
pub use telemetry::{MetricsCollector, MetricsSink, UsageLog};
