//! Cached availability checks

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::debug;

/// Upper bound for a single availability command
const CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs a presence check once and remembers the answer for the process lifetime
#[derive(Debug)]
pub struct AvailabilityCheck {
    program: String,
    args: Vec<String>,
    result: OnceCell<bool>,
}

impl AvailabilityCheck {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            result: OnceCell::new(),
        }
    }

    /// A check with a fixed answer
    pub fn fixed(available: bool) -> Self {
        let check = Self::new(String::new(), &[]);
        let _ = check.result.set(available);
        check
    }

    /// Whether the checked program ran and exited successfully
    pub async fn check(&self) -> bool {
        *self.result.get_or_init(|| self.run()).await
    }

    async fn run(&self) -> bool {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let available = match tokio::time::timeout(CHECK_TIMEOUT, cmd.status()).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                debug!("Availability check {} failed to start: {}", self.program, e);
                false
            }
            Err(_) => {
                debug!("Availability check {} timed out", self.program);
                false
            }
        };
        debug!("Availability check {} {:?} -> {}", self.program, self.args, available);
        available
    }
}
