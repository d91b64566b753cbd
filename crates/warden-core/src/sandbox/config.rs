//! Sandbox configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::types::BackendKind;

/// Backend selection and per-backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Backends to try, strongest isolation first
    pub preference: Vec<BackendKind>,
    /// Interpreter used by the resource-limited process backend
    pub interpreter: String,
    /// Container CLI binary
    pub docker_binary: String,
    /// Image the container and microVM backends run
    pub container_image: String,
    /// Kernel-isolating container runtime
    pub microvm_runtime: String,
    /// Optional seccomp profile passed to the container runtime
    pub seccomp_profile: Option<PathBuf>,
    /// CPU share granted to each container
    pub container_cpus: String,
    /// Process ceiling inside containers and for the process backend
    pub max_processes: u32,
    /// Open file ceiling for the process backend
    pub max_open_files: u32,
    /// Python interpreter compiled to WASI
    pub wasm_module: Option<PathBuf>,
    /// Host directory with the interpreter's standard library, mounted read-only
    pub wasm_stdlib_dir: Option<PathBuf>,
    /// Captured stdout/stderr ceiling per stream
    pub max_output_bytes: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            preference: BackendKind::preference(),
            interpreter: "python3".to_string(),
            docker_binary: "docker".to_string(),
            container_image: "python:3.11-slim".to_string(),
            microvm_runtime: "runsc".to_string(),
            seccomp_profile: None,
            container_cpus: "0.5".to_string(),
            max_processes: 50,
            max_open_files: 100,
            wasm_module: None,
            wasm_stdlib_dir: None,
            max_output_bytes: 1024 * 1024,
        }
    }
}
