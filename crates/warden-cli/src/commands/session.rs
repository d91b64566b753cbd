//! `warden session`
//!
//! The manager lives only for the duration of the command, so state does not
//! carry over between invocations; `snapshot` output can be fed back through
//! `restore` in a later process.

use std::sync::Arc;
use warden_core::WardenConfig;
use warden_core::session::{SessionCommand, SessionManager, SessionProtocol};

use super::parse_params;
use crate::console::CliConsole;

pub async fn execute(config: &WardenConfig, command: &str, params: &str) -> anyhow::Result<()> {
    if SessionCommand::parse(command).is_none() {
        let known: Vec<&str> = SessionCommand::ALL.iter().map(|c| c.as_str()).collect();
        anyhow::bail!("Unknown command: {command} (expected one of {})", known.join(", "));
    }
    let params = parse_params(params)?;

    let manager = Arc::new(SessionManager::new(config.sessions.clone()));
    let protocol = SessionProtocol::new(manager.clone());
    let response = protocol.execute_command(command, &params);
    manager.shutdown().await;

    CliConsole::new(false).json(&response);
    if let Some(error) = response.get("error").and_then(|e| e.as_str()) {
        anyhow::bail!("{error}");
    }
    Ok(())
}
