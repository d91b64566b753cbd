//! Resource limits for sandboxed processes

use serde::{Deserialize, Serialize};

use super::config::SandboxConfig;
use super::types::ExecutionRequest;

/// OS-level ceilings applied to a sandboxed process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Maximum address space in bytes
    pub max_memory_bytes: Option<u64>,

    /// Maximum CPU time in seconds
    pub max_cpu_seconds: Option<u64>,

    /// Maximum captured output per stream in bytes
    pub max_output_bytes: Option<u64>,

    /// Maximum number of processes
    pub max_processes: Option<u32>,

    /// Maximum number of open files
    pub max_open_files: Option<u32>,

    /// Set the core dump size to zero
    pub disable_core_dumps: bool,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_memory_bytes: Some(256 * 1024 * 1024), // 256 MB
            max_cpu_seconds: Some(30),
            max_output_bytes: Some(1024 * 1024), // 1 MB
            max_processes: Some(50),
            max_open_files: Some(100),
            disable_core_dumps: true,
        }
    }
}

impl ResourceLimits {
    /// Limits for one request
    ///
    /// CPU time gets one second of headroom over the wall-clock limit so the
    /// timeout, not SIGXCPU, is what ends a busy loop.
    pub fn for_request(request: &ExecutionRequest, config: &SandboxConfig) -> Self {
        Self {
            max_memory_bytes: Some(request.memory_mb.saturating_mul(1024 * 1024)),
            max_cpu_seconds: Some(request.timeout_seconds.saturating_add(1)),
            max_output_bytes: Some(config.max_output_bytes),
            max_processes: Some(config.max_processes),
            max_open_files: Some(config.max_open_files),
            disable_core_dumps: true,
        }
    }

    /// No ceilings except core dumps; used for trusted helper processes
    pub fn unlimited() -> Self {
        Self {
            max_memory_bytes: None,
            max_cpu_seconds: None,
            max_output_bytes: None,
            max_processes: None,
            max_open_files: None,
            disable_core_dumps: true,
        }
    }

    /// Check if output size is within limits
    pub fn check_output(&self, bytes: u64) -> bool {
        self.max_output_bytes.map_or(true, |limit| bytes <= limit)
    }
}
