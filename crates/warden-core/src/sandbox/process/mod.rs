//! Spawning and supervising sandboxed child processes

mod limits;
mod output;

use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, warn};

use super::SandboxError;
use super::limits::ResourceLimits;

pub(crate) use limits::apply_unix_limits;
use output::read_output_limited;

/// How long to wait for pipe readers after the process group was killed
pub(crate) const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Raw outcome of one supervised process
#[derive(Debug, Clone)]
pub(crate) struct ProcessOutcome {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub duration: Duration,
}

/// Run `cmd` in its own process group under `limits`
///
/// On timeout the whole group receives SIGKILL and the child is reaped before
/// returning, so nothing started by the command outlives the call.
pub(crate) async fn run_supervised(
    mut cmd: Command,
    limits: &ResourceLimits,
    timeout_duration: Duration,
) -> Result<ProcessOutcome, SandboxError> {
    let start = Instant::now();

    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(Stdio::null())
        .kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    apply_unix_limits(&mut cmd, limits);

    let mut child = cmd
        .spawn()
        .map_err(|e| SandboxError::SpawnFailed(e.to_string()))?;
    let pid = child.id();

    let max_output = limits.max_output_bytes.unwrap_or(u64::MAX);
    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();

    let stdout_task = tokio::spawn(async move {
        match stdout_handle {
            Some(stdout) => read_output_limited(stdout, max_output).await,
            None => String::new(),
        }
    });
    let stderr_task = tokio::spawn(async move {
        match stderr_handle {
            Some(stderr) => read_output_limited(stderr, max_output).await,
            None => String::new(),
        }
    });

    let (exit_code, timed_out) = match timeout(timeout_duration, child.wait()).await {
        Ok(Ok(status)) => (exit_code_of(status), false),
        Ok(Err(e)) => {
            kill_group(pid, &mut child).await;
            return Err(SandboxError::Internal(format!("Process wait failed: {}", e)));
        }
        Err(_) => {
            debug!("Process {:?} exceeded {:?}, killing its group", pid, timeout_duration);
            kill_group(pid, &mut child).await;
            (None, true)
        }
    };

    let stdout = timeout(DRAIN_TIMEOUT, stdout_task)
        .await
        .ok()
        .and_then(|r| r.ok())
        .unwrap_or_default();
    let stderr = timeout(DRAIN_TIMEOUT, stderr_task)
        .await
        .ok()
        .and_then(|r| r.ok())
        .unwrap_or_default();

    Ok(ProcessOutcome {
        exit_code,
        stdout,
        stderr,
        timed_out,
        duration: start.elapsed(),
    })
}

/// Exit code, or the negated signal number when the process was killed
fn exit_code_of(status: std::process::ExitStatus) -> Option<i32> {
    if let Some(code) = status.code() {
        return Some(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status.signal().map(|sig| -sig)
    }
    #[cfg(not(unix))]
    {
        None
    }
}

/// SIGKILL the process group led by `pid`, then reap the child
async fn kill_group(pid: Option<u32>, child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = pid {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            debug!("killpg({}) failed: {}", pid, e);
        }
    }
    #[cfg(not(unix))]
    let _ = pid;

    if let Err(e) = child.kill().await {
        debug!("Child already exited: {}", e);
    }
    if let Err(e) = child.wait().await {
        warn!("Failed to reap killed child: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_simple_execution() {
        let mut cmd = Command::new("echo");
        cmd.arg("hello");
        let outcome = run_supervised(cmd, &ResourceLimits::unlimited(), Duration::from_secs(10))
            .await
            .unwrap();

        assert_eq!(outcome.exit_code, Some(0));
        assert!(outcome.stdout.contains("hello"));
        assert!(!outcome.timed_out);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_code() {
        let outcome = run_supervised(
            Command::new("false"),
            &ResourceLimits::unlimited(),
            Duration::from_secs(10),
        )
        .await
        .unwrap();

        assert_eq!(outcome.exit_code, Some(1));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_group() {
        // The shell's background child must die with the group
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "sleep 30 & sleep 30"]);
        let start = Instant::now();
        let outcome = run_supervised(cmd, &ResourceLimits::unlimited(), Duration::from_millis(200))
            .await
            .unwrap();

        assert!(outcome.timed_out);
        assert!(outcome.exit_code.is_none());
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let err = run_supervised(
            Command::new("warden-no-such-binary"),
            &ResourceLimits::unlimited(),
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SandboxError::SpawnFailed(_)));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_unappliable_limit_refuses_spawn() {
        // RLIMIT_NOFILE above fs.nr_open is rejected even for root
        let limits = ResourceLimits {
            max_open_files: Some(u32::MAX),
            ..ResourceLimits::unlimited()
        };
        let err = run_supervised(Command::new("true"), &limits, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::SpawnFailed(_)));
    }
}
