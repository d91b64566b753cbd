//! Execution policy: what generated code may do and under which ceilings
//!
//! A policy is loaded once from a trusted path, verified against an Ed25519
//! public key, and then used to statically check every code string before any
//! backend sees it.

mod document;
mod engine;
mod imports;
mod signing;


pub use document::{ExecutionPolicy, FilesystemAccess, PolicyLimits};
pub use engine::{PolicyEngine, ValidationOutcome, ValidationRecord, Violation};
pub use imports::{ImportRef, collect_imports, is_import_allowed};
pub use signing::{decode_signing_key, decode_verifying_key, sign_policy, verify_policy_signature};

use std::path::PathBuf;

/// Errors raised while loading or verifying a policy
///
/// Every variant is fatal for the load that produced it: the engine never
/// falls back to a more permissive policy.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PolicyError {
    #[error("Failed to read policy {path:?}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to parse policy {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Policy {path:?} carries no signature")]
    MissingSignature { path: PathBuf },

    #[error("Policy {path:?} has an invalid signature")]
    InvalidSignature { path: PathBuf },

    #[error("No trusted key configured to verify policy {path:?}")]
    NoTrustedKey { path: PathBuf },

    #[error("Invalid key material: {0}")]
    InvalidKey(String),
}
