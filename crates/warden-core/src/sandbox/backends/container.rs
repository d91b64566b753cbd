//! Ephemeral unprivileged containers driven through the docker CLI

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use super::outcome_to_result;
use crate::sandbox::SandboxBackend;
use crate::sandbox::availability::AvailabilityCheck;
use crate::sandbox::config::SandboxConfig;
use crate::sandbox::limits::ResourceLimits;
use crate::sandbox::process::run_supervised;
use crate::sandbox::types::{BackendKind, ExecutionRequest, ExecutionResult};

/// Exit status docker itself uses when `docker run` fails before the container starts
const DOCKER_RUN_FAILED: i32 = 125;

/// Upper bound for `docker kill` after a timeout
pub(crate) const KILL_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs code in a network-less, read-only container
///
/// The code file is mounted read-only and a separate scratch directory is
/// mounted writable; both live in a temporary directory removed after the run.
#[derive(Debug, Clone)]
pub struct ContainerBackend {
    kind: BackendKind,
    config: SandboxConfig,
    runtime: Option<String>,
    availability: Arc<AvailabilityCheck>,
}

impl ContainerBackend {
    pub fn new(config: &SandboxConfig) -> Self {
        let check = AvailabilityCheck::new(config.docker_binary.clone(), &["version"]);
        Self {
            kind: BackendKind::Container,
            config: config.clone(),
            runtime: None,
            availability: Arc::new(check),
        }
    }

    /// Same invocation under an alternative OCI runtime, reported as `kind`
    pub(crate) fn with_runtime(config: &SandboxConfig, kind: BackendKind, runtime: &str) -> Self {
        Self {
            kind,
            runtime: Some(runtime.to_string()),
            ..Self::new(config)
        }
    }

    /// Replace the availability check
    pub fn with_check(mut self, check: AvailabilityCheck) -> Self {
        self.availability = Arc::new(check);
        self
    }

    /// Arguments for `docker run`, excluding the binary itself
    pub fn run_args(
        &self,
        request: &ExecutionRequest,
        name: &str,
        code_file: &Path,
        scratch_dir: &Path,
    ) -> Vec<String> {
        let memory = format!("{}m", request.memory_mb);
        let network = if request.network_allowed { "bridge" } else { "none" };

        let mut args: Vec<String> = vec!["run".into(), "--rm".into(), "--name".into(), name.into()];
        if let Some(runtime) = &self.runtime {
            args.extend(["--runtime".into(), runtime.clone()]);
        }
        args.extend([
            "--network".into(),
            network.into(),
            "--memory".into(),
            memory.clone(),
            "--memory-swap".into(),
            memory,
            "--cpus".into(),
            self.config.container_cpus.clone(),
            "--pids-limit".into(),
            self.config.max_processes.to_string(),
            "--read-only".into(),
            "--security-opt".into(),
            "no-new-privileges".into(),
            "--cap-drop".into(),
            "ALL".into(),
            "--tmpfs".into(),
            "/tmp:rw,size=16m".into(),
        ]);
        if let Some(profile) = &self.config.seccomp_profile {
            args.extend([
                "--security-opt".into(),
                format!("seccomp={}", profile.display()),
            ]);
        }
        args.extend([
            "-v".into(),
            format!("{}:/code/main.py:ro", code_file.display()),
            "-v".into(),
            format!("{}:/scratch:rw", scratch_dir.display()),
            "-w".into(),
            "/code".into(),
            self.config.container_image.clone(),
            "python".into(),
            "/code/main.py".into(),
        ]);
        args
    }

    async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionResult, std::io::Error> {
        let staging = tempfile::Builder::new().prefix("warden-").tempdir()?;
        let code_file = staging.path().join("main.py");
        let scratch_dir = staging.path().join("scratch");
        tokio::fs::write(&code_file, &request.code).await?;
        tokio::fs::create_dir(&scratch_dir).await?;

        let name = format!("warden-{}", uuid::Uuid::new_v4().simple());
        let mut guard = ContainerGuard::new(&self.config.docker_binary, &name);
        let mut cmd = Command::new(&self.config.docker_binary);
        cmd.args(self.run_args(request, &name, &code_file, &scratch_dir));

        // The docker client is trusted; only its captured output is bounded.
        let limits = ResourceLimits {
            max_output_bytes: Some(self.config.max_output_bytes),
            ..ResourceLimits::unlimited()
        };
        let limit = request.timeout();

        let outcome = match run_supervised(cmd, &limits, limit).await {
            Ok(outcome) => outcome,
            Err(e) => {
                guard.disarm();
                return Ok(ExecutionResult::error(Some(self.kind), e.to_string()));
            }
        };

        if outcome.timed_out {
            self.kill_container(&name).await;
        }
        guard.disarm();

        if !outcome.timed_out && outcome.exit_code == Some(DOCKER_RUN_FAILED) {
            return Ok(ExecutionResult::error(
                Some(self.kind),
                format!("Container failed to start: {}", outcome.stderr.trim()),
            ));
        }

        Ok(outcome_to_result(self.kind, outcome, limit))
    }

    async fn kill_container(&self, name: &str) {
        let mut cmd = Command::new(&self.config.docker_binary);
        cmd.args(["kill", name])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        match tokio::time::timeout(KILL_TIMEOUT, cmd.status()).await {
            Ok(Ok(status)) if status.success() => debug!("Killed container {}", name),
            Ok(Ok(status)) => debug!("docker kill {} exited with {}", name, status),
            Ok(Err(e)) => warn!("Failed to run docker kill for {}: {}", name, e),
            Err(_) => warn!("docker kill {} did not finish in {:?}", name, KILL_TIMEOUT),
        }
    }
}

/// Kills a named container when dropped while still armed
///
/// Covers the run future being dropped mid-flight (task abort), where the
/// awaited `docker kill` would otherwise never be issued.
#[derive(Debug)]
struct ContainerGuard {
    docker_binary: String,
    name: String,
    armed: bool,
}

impl ContainerGuard {
    fn new(docker_binary: &str, name: &str) -> Self {
        Self {
            docker_binary: docker_binary.to_string(),
            name: name.to_string(),
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if tokio::runtime::Handle::try_current().is_err() {
            warn!("No runtime to kill abandoned container {}", self.name);
            return;
        }
        warn!("Container {} abandoned mid-run, killing it", self.name);
        // Detached: tokio reaps the child once it exits.
        let spawned = Command::new(&self.docker_binary)
            .args(["kill", &self.name])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        if let Err(e) = spawned {
            warn!("Failed to run docker kill for {}: {}", self.name, e);
        }
    }
}

#[async_trait]
impl SandboxBackend for ContainerBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn available(&self) -> bool {
        self.availability.check().await
    }

    #[instrument(skip(self, request), fields(backend = %self.kind))]
    async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        match self.run(request).await {
            Ok(result) => result,
            Err(e) => ExecutionResult::error(Some(self.kind), format!("Staging failed: {}", e)),
        }
    }
}
