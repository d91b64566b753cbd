//! Interpreter process under OS resource limits

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::outcome_to_result;
use crate::sandbox::SandboxBackend;
use crate::sandbox::config::SandboxConfig;
use crate::sandbox::limits::ResourceLimits;
use crate::sandbox::process::run_supervised;
use crate::sandbox::types::{BackendKind, ExecutionRequest, ExecutionResult};

/// Backend of last resort: `python3 -c <code>` with rlimits applied before exec
///
/// Always reports itself available. The interpreter runs in a fresh process
/// group with an emptied environment so that a timeout can kill everything it
/// started and host secrets are not inherited.
#[derive(Debug, Clone)]
pub struct ResourceLimitedBackend {
    config: SandboxConfig,
}

impl ResourceLimitedBackend {
    pub fn new(config: &SandboxConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn command(&self, request: &ExecutionRequest) -> Command {
        let mut cmd = Command::new(&self.config.interpreter);
        cmd.arg("-c").arg(&request.code);
        cmd.env_clear();
        if let Some(path) = std::env::var_os("PATH") {
            cmd.env("PATH", path);
        }
        cmd.env("PYTHONDONTWRITEBYTECODE", "1");
        cmd.current_dir(std::env::temp_dir());
        cmd
    }
}

#[async_trait]
impl SandboxBackend for ResourceLimitedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Process
    }

    async fn available(&self) -> bool {
        true
    }

    #[instrument(skip(self, request), fields(backend = "process"))]
    async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        let limits = ResourceLimits::for_request(request, &self.config);
        let limit = request.timeout();

        match run_supervised(self.command(request), &limits, limit).await {
            Ok(outcome) => {
                debug!(
                    "Process finished in {:?} (exit {:?}, timed out: {})",
                    outcome.duration, outcome.exit_code, outcome.timed_out
                );
                outcome_to_result(BackendKind::Process, outcome, limit)
            }
            Err(e) => ExecutionResult::error(Some(BackendKind::Process), e.to_string()),
        }
    }
}
