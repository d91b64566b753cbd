//! Configuration management for Warden
//!
//! Configuration is read from a file (TOML, YAML or JSON by extension) and then
//! overridden by `WARDEN_`-prefixed environment variables.

pub mod env_loader;
pub mod file_loader;
pub mod logging_config;
pub mod model;

pub use env_loader::apply_env_overrides;
pub use file_loader::load_from_file;
pub use logging_config::{LogFormat, LoggingConfig};
pub use model::{AuditConfig, PolicyConfig, TelemetryConfig, WardenConfig, warden_home};

use crate::error::WardenResult;
use std::path::Path;

/// Load configuration from `path` and apply environment overrides
pub fn load_config(path: &Path) -> WardenResult<WardenConfig> {
    let mut config = load_from_file(path)?;
    apply_env_overrides(&mut config)?;
    config.validate()?;
    tracing::debug!("Loaded configuration from {:?}", path);
    Ok(config)
}
