//! From trait implementations for WardenError conversions

use super::types::WardenError;

impl From<anyhow::Error> for WardenError {
    fn from(error: anyhow::Error) -> Self {
        Self::other(error.to_string())
    }
}

impl From<std::io::Error> for WardenError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<serde_json::Error> for WardenError {
    fn from(error: serde_json::Error) -> Self {
        Self::json(error.to_string())
    }
}

impl From<crate::policy::PolicyError> for WardenError {
    fn from(error: crate::policy::PolicyError) -> Self {
        Self::policy(error.to_string())
    }
}

impl From<crate::capability::CapabilityError> for WardenError {
    fn from(error: crate::capability::CapabilityError) -> Self {
        match error {
            crate::capability::CapabilityError::NotFound(id) => {
                Self::invalid_input_field(format!("Unknown capability '{}'", id), "capability")
            }
            other => Self::config_with_context(other.to_string(), "capabilities"),
        }
    }
}

impl From<crate::sandbox::SandboxError> for WardenError {
    fn from(error: crate::sandbox::SandboxError) -> Self {
        match error {
            crate::sandbox::SandboxError::Timeout(duration) => Self::timeout(duration.as_secs()),
            other => Self::sandbox(other.to_string()),
        }
    }
}
