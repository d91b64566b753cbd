//! Environment variable overrides
//!
//! Every variable uses the `WARDEN_` prefix. Unset variables leave the
//! configuration untouched; unparsable values are configuration errors.

use crate::cache::CacheBackendKind;
use crate::config::model::WardenConfig;
use crate::error::{WardenError, WardenResult};
use crate::executor::ExecutionMode;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Apply `WARDEN_*` environment variables on top of `config`
pub fn apply_env_overrides(config: &mut WardenConfig) -> WardenResult<()> {
    if let Some(mode) = parse_var::<ExecutionMode>("WARDEN_EXECUTION_MODE")? {
        config.features.execution_mode = mode;
    }
    if let Some(max_tokens) = parse_var::<usize>("WARDEN_MAX_TOKENS")? {
        config.features.max_tokens_per_request = max_tokens;
    }
    if let Some(enabled) = parse_var::<bool>("WARDEN_ENABLE_CACHING")? {
        config.features.enable_caching = enabled;
    }
    if let Some(enabled) = parse_var::<bool>("WARDEN_ENABLE_METRICS")? {
        config.features.enable_metrics = enabled;
    }
    if let Some(ttl) = parse_var::<u64>("WARDEN_CACHE_TTL")? {
        config.features.cache_ttl_seconds = ttl;
    }
    if let Some(backend) = parse_var::<CacheBackendKind>("WARDEN_CACHE_BACKEND")? {
        config.cache.backend = backend;
    }
    if let Ok(path) = env::var("WARDEN_POLICY_PATH") {
        config.policy.path = expand_path(&path);
    }
    if let Ok(key) = env::var("WARDEN_POLICY_KEY") {
        config.policy.trusted_key = Some(key);
    }
    if let Ok(secret) = env::var("WARDEN_CAPABILITY_SECRET") {
        config.capabilities.signing_secret = Some(secret);
    }
    if let Ok(path) = env::var("WARDEN_CAPABILITY_MANIFEST") {
        config.capabilities.manifest = Some(expand_path(&path));
    }
    if let Ok(path) = env::var("WARDEN_AUDIT_DIR") {
        config.audit.directory = expand_path(&path);
    }
    if let Ok(path) = env::var("WARDEN_USAGE_LOG") {
        config.telemetry.usage_log = Some(expand_path(&path));
    }
    if let Ok(level) = env::var("WARDEN_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(format) = env::var("WARDEN_LOG_FORMAT") {
        config.logging.format = format
            .parse()
            .map_err(|e: String| WardenError::config_with_context(e, "WARDEN_LOG_FORMAT"))?;
    }
    Ok(())
}

fn parse_var<T>(name: &str) -> WardenResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            WardenError::config_with_context(format!("Invalid {} value '{}': {}", name, raw, e), name)
        }),
        Err(_) => Ok(None),
    }
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}
