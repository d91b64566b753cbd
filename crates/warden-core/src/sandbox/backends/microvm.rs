//! Containers under a kernel-isolating runtime such as gVisor

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::container::ContainerBackend;
use crate::sandbox::SandboxBackend;
use crate::sandbox::availability::AvailabilityCheck;
use crate::sandbox::config::SandboxConfig;
use crate::sandbox::types::{BackendKind, ExecutionRequest, ExecutionResult};

/// Container invocation with `--runtime <microvm_runtime>`
///
/// Available only when both the runtime binary and the container CLI are.
#[derive(Debug, Clone)]
pub struct MicroVmBackend {
    inner: ContainerBackend,
    runtime_check: Arc<AvailabilityCheck>,
}

impl MicroVmBackend {
    pub fn new(config: &SandboxConfig) -> Self {
        let runtime = config.microvm_runtime.as_str();
        Self {
            inner: ContainerBackend::with_runtime(config, BackendKind::Microvm, runtime),
            runtime_check: Arc::new(AvailabilityCheck::new(runtime, &["--version"])),
        }
    }

    /// Replace both availability checks
    pub fn with_checks(mut self, runtime: AvailabilityCheck, docker: AvailabilityCheck) -> Self {
        self.runtime_check = Arc::new(runtime);
        self.inner = self.inner.with_check(docker);
        self
    }
}

#[async_trait]
impl SandboxBackend for MicroVmBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Microvm
    }

    async fn available(&self) -> bool {
        if !self.runtime_check.check().await {
            debug!("MicroVM runtime not installed");
            return false;
        }
        self.inner.available().await
    }

    async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        self.inner.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_requires_runtime_and_docker() {
        let config = SandboxConfig::default();

        let backend = MicroVmBackend::new(&config)
            .with_checks(AvailabilityCheck::fixed(false), AvailabilityCheck::fixed(true));
        assert!(!backend.available().await);

        let backend = MicroVmBackend::new(&config)
            .with_checks(AvailabilityCheck::fixed(true), AvailabilityCheck::fixed(false));
        assert!(!backend.available().await);

        let backend = MicroVmBackend::new(&config)
            .with_checks(AvailabilityCheck::fixed(true), AvailabilityCheck::fixed(true));
        assert!(backend.available().await);
    }

    #[tokio::test]
    async fn test_missing_runtime_binary() {
        let config = SandboxConfig {
            microvm_runtime: "warden-no-such-runsc".to_string(),
            ..Default::default()
        };
        assert!(!MicroVmBackend::new(&config).available().await);
    }
}
