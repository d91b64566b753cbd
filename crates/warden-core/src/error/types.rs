//! Core error types for Warden

use thiserror::Error;

/// Result type alias for Warden operations
pub type WardenResult<T> = Result<T, WardenError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context<C: std::fmt::Display>(self, context: C) -> WardenResult<T>;

    /// Add context lazily (only evaluated on error)
    fn with_context<C: std::fmt::Display, F: FnOnce() -> C>(self, f: F) -> WardenResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn context<C: std::fmt::Display>(self, context: C) -> WardenResult<T> {
        self.map_err(|e| WardenError::other(format!("{}: {}", context, e)))
    }

    fn with_context<C: std::fmt::Display, F: FnOnce() -> C>(self, f: F) -> WardenResult<T> {
        self.map_err(|e| WardenError::other(format!("{}: {}", f(), e)))
    }
}

/// Main error type for Warden
#[derive(Error, Debug, Clone)]
pub enum WardenError {
    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// Policy loading or verification errors
    #[error("Policy error: {message}")]
    Policy {
        message: String,
        context: Option<String>,
    },

    /// Sandbox backend errors
    #[error("Sandbox error: {message}")]
    Sandbox {
        message: String,
        backend: Option<String>,
    },

    /// Session errors
    #[error("Session error: {message}")]
    Session {
        message: String,
        session_id: Option<String>,
    },

    /// Cache errors
    #[error("Cache error: {message}")]
    Cache {
        message: String,
        context: Option<String>,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json { message: String },

    /// Invalid input errors
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
    },

    /// Execution timeout
    #[error("Execution timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Generic error with context
    #[error("Error: {message}")]
    Other {
        message: String,
        context: Option<String>,
    },
}

impl WardenError {
    /// Short machine-readable code for the error kind
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "WARDEN_CONFIG",
            Self::Policy { .. } => "WARDEN_POLICY",
            Self::Sandbox { .. } => "WARDEN_SANDBOX",
            Self::Session { .. } => "WARDEN_SESSION",
            Self::Cache { .. } => "WARDEN_CACHE",
            Self::Io { .. } => "WARDEN_IO",
            Self::Json { .. } => "WARDEN_JSON",
            Self::InvalidInput { .. } => "WARDEN_INVALID_INPUT",
            Self::Timeout { .. } => "WARDEN_TIMEOUT",
            Self::Other { .. } => "WARDEN_OTHER",
        }
    }

    /// Optional context attached to the error
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::Config { context, .. }
            | Self::Policy { context, .. }
            | Self::Cache { context, .. }
            | Self::Other { context, .. } => context.as_deref(),
            Self::Io { path, .. } => path.as_deref(),
            Self::Sandbox { backend, .. } => backend.as_deref(),
            Self::Session { session_id, .. } => session_id.as_deref(),
            Self::InvalidInput { field, .. } => field.as_deref(),
            Self::Json { .. } | Self::Timeout { .. } => None,
        }
    }
}
