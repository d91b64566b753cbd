//! Feature flags governing how intents are served

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How the router serves an intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Answer from the static tool route map, never execute code
    McpOnly,
    /// Always generate and execute code
    CodeExecution,
    /// Simple lookups take the tool route, everything else executes code
    #[default]
    Hybrid,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::McpOnly => "mcp_only",
            Self::CodeExecution => "code_execution",
            Self::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "mcp_only" | "mcp" => Ok(Self::McpOnly),
            "code_execution" | "code" => Ok(Self::CodeExecution),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(format!("unknown execution mode '{}'", other)),
        }
    }
}

/// Feature flags for the executor and router
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub execution_mode: ExecutionMode,
    /// Reported in response envelopes; code always runs through the sandbox
    pub enable_sandbox: bool,
    pub enable_caching: bool,
    pub enable_metrics: bool,
    /// Estimated tokens above which a request is refused
    pub max_tokens_per_request: usize,
    pub cache_ttl_seconds: u64,
    /// Largest single cached value, in KiB
    pub context_size_limit_kb: u64,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            execution_mode: ExecutionMode::Hybrid,
            enable_sandbox: true,
            enable_caching: true,
            enable_metrics: true,
            max_tokens_per_request: 1000,
            cache_ttl_seconds: 300,
            context_size_limit_kb: 100,
        }
    }
}

impl FeatureFlags {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("mcp_only".parse::<ExecutionMode>(), Ok(ExecutionMode::McpOnly));
        assert_eq!("code-execution".parse::<ExecutionMode>(), Ok(ExecutionMode::CodeExecution));
        assert_eq!("HYBRID".parse::<ExecutionMode>(), Ok(ExecutionMode::Hybrid));
        assert!("turbo".parse::<ExecutionMode>().is_err());
    }

    #[test]
    fn test_mode_serde_is_snake_case() {
        let json = serde_json::to_string(&ExecutionMode::McpOnly).unwrap();
        assert_eq!(json, "\"mcp_only\"");
    }

    #[test]
    fn test_defaults() {
        let flags = FeatureFlags::default();
        assert_eq!(flags.execution_mode, ExecutionMode::Hybrid);
        assert_eq!(flags.max_tokens_per_request, 1000);
        assert_eq!(flags.cache_ttl(), Duration::from_secs(300));
        assert!(flags.enable_sandbox);
    }
}
