//! Error types for Warden
//!
//! `WardenError` is the crate-wide error. Layers with their own failure
//! vocabulary (`SandboxError`, `PolicyError`) convert into it at their edges.

mod constructors;
mod conversions;
mod types;

pub use types::{ResultExt, WardenError, WardenResult};
