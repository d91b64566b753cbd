//! File-based configuration loading

use crate::config::model::WardenConfig;
use crate::error::{WardenError, WardenResult};
use std::fs;
use std::path::Path;

/// Load configuration from a file
///
/// Supports JSON, TOML, and YAML formats based on file extension.
/// Returns default config if file doesn't exist.
pub fn load_from_file(path: &Path) -> WardenResult<WardenConfig> {
    if !path.exists() {
        tracing::debug!("Config file {:?} not found, using defaults", path);
        return Ok(WardenConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|e| {
        WardenError::config_with_context(
            format!("Failed to read config file: {}", e),
            format!("Reading configuration from '{}'", path.display()),
        )
    })?;

    let config: WardenConfig = match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|e| {
            WardenError::config_with_context(
                format!("Failed to parse TOML config: {}", e),
                format!("Deserializing TOML configuration from '{}'", path.display()),
            )
        })?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| {
            WardenError::config_with_context(
                format!("Failed to parse YAML config: {}", e),
                format!("Deserializing YAML configuration from '{}'", path.display()),
            )
        })?,
        _ => serde_json::from_str(&content).map_err(|e| {
            WardenError::config_with_context(
                format!("Failed to parse JSON config: {}", e),
                format!("Deserializing JSON configuration from '{}'", path.display()),
            )
        })?,
    };

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheBackendKind;
    use crate::executor::ExecutionMode;
    use crate::sandbox::BackendKind;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_from_file(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.features.max_tokens_per_request, 1000);
    }

    #[test]
    fn test_load_from_json_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("warden.json");
        let config_json = r#"{
            "features": {
                "execution_mode": "code_execution",
                "max_tokens_per_request": 2000
            },
            "sessions": {
                "max_sessions": 5,
                "reaper_interval": "10s"
            }
        }"#;
        fs::write(&config_path, config_json).unwrap();

        let config = load_from_file(&config_path).unwrap();
        assert_eq!(config.features.execution_mode, ExecutionMode::CodeExecution);
        assert_eq!(config.features.max_tokens_per_request, 2000);
        assert_eq!(config.sessions.max_sessions, 5);
        assert_eq!(config.sessions.reaper_interval.as_secs(), 10);
        // Untouched sections keep their defaults
        assert!(config.features.enable_caching);
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("warden.toml");
        let config_toml = r#"
[sandbox]
preference = ["container", "process"]
container_image = "python:3.12-slim"

[cache]
backend = "disk"
"#;
        fs::write(&config_path, config_toml).unwrap();

        let config = load_from_file(&config_path).unwrap();
        assert_eq!(
            config.sandbox.preference,
            vec![BackendKind::Container, BackendKind::Process]
        );
        assert_eq!(config.sandbox.container_image, "python:3.12-slim");
        assert_eq!(config.cache.backend, CacheBackendKind::Disk);
    }

    #[test]
    fn test_load_from_yaml_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("warden.yaml");
        fs::write(&config_path, "logging:\n  level: debug\n  format: json\n").unwrap();

        let config = load_from_file(&config_path).unwrap();
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("broken.toml");
        fs::write(&config_path, "[features\nmax = ").unwrap();

        let err = load_from_file(&config_path).unwrap_err();
        assert!(matches!(err, WardenError::Config { .. }));
    }
}
