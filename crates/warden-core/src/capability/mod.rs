//! Capability registry: what tool integrations exist and what they cost
//!
//! Agents start from a compact manifest, then pay for full details one
//! capability at a time. Every descriptor carries an HMAC-SHA256 signature
//! and the registry refuses descriptors that do not verify. The intent router
//! resolves tool routes and token estimates here.

mod descriptor;
mod protocol;
mod registry;


pub use descriptor::{
    Capability, CapabilityDescriptor, CapabilityDetails, MAX_COST, MAX_DESC_CHARS,
    MAX_NAME_CHARS, MAX_TAGS, builtin_capabilities,
};
pub use protocol::{
    CapabilityProtocol, Handshake, LOAD_ALL_BELOW, LoadStrategy, Negotiation, PROGRESSIVE_BELOW,
    PROGRESSIVE_INITIAL, PROTOCOL_VERSION,
};
pub use registry::{
    CapabilityRegistry, CapabilityStats, CompactManifest, MANIFEST_VERSION, Manifest,
    ManifestEntry, ToolRoute,
};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CapabilityError {
    #[error("Capability '{0}' not found")]
    NotFound(String),

    #[error("Capability '{0}' has an invalid signature")]
    InvalidSignature(String),

    #[error("Capability '{id}' is invalid: {reason}")]
    InvalidDescriptor { id: String, reason: String },

    #[error("Intent '{intent}' is already routed by capability '{owner}'")]
    RouteConflict { intent: String, owner: String },

    #[error("Invalid capability secret: {0}")]
    InvalidSecret(String),

    #[error("No capability secret configured to verify manifest {path:?}")]
    MissingSecret { path: PathBuf },

    #[error("Failed to read capability manifest {path:?}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to parse capability manifest {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Capability signing and extra manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityConfig {
    /// HMAC key for descriptor signatures; a random key is used when unset
    pub signing_secret: Option<String>,
    /// JSON array of signed capabilities registered after the built-ins
    pub manifest: Option<PathBuf>,
}
