//! JSON command surface over the session manager

use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

use super::manager::SessionManager;
use super::types::SessionSnapshot;

const DEFAULT_EXTEND_SECS: u64 = 3600;

/// Session commands understood by [`SessionProtocol::execute_command`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Create,
    Reset,
    Extend,
    List,
    Snapshot,
    Restore,
    Stats,
}

impl SessionCommand {
    pub const ALL: [SessionCommand; 7] = [
        Self::Create,
        Self::Reset,
        Self::Extend,
        Self::List,
        Self::Snapshot,
        Self::Restore,
        Self::Stats,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "create" => Some(Self::Create),
            "reset" => Some(Self::Reset),
            "extend" => Some(Self::Extend),
            "list" => Some(Self::List),
            "snapshot" => Some(Self::Snapshot),
            "restore" => Some(Self::Restore),
            "stats" => Some(Self::Stats),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Reset => "reset",
            Self::Extend => "extend",
            Self::List => "list",
            Self::Snapshot => "snapshot",
            Self::Restore => "restore",
            Self::Stats => "stats",
        }
    }
}

/// RPC-style command handler for the outer request layer
///
/// Every outcome, including failures, is a JSON object; failures carry a
/// single `error` field.
#[derive(Debug, Clone)]
pub struct SessionProtocol {
    manager: Arc<SessionManager>,
}

fn error_response(message: impl Into<String>) -> Value {
    json!({ "error": message.into() })
}

fn missing(name: &str) -> Value {
    error_response(format!("Missing parameter: {name}"))
}

fn str_param<'a>(params: &'a Value, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

fn secs_param(params: &Value, name: &str) -> Result<Option<u64>, Value> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| error_response(format!("Invalid parameter: {name}"))),
    }
}

impl SessionProtocol {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    pub fn execute_command(&self, command: &str, params: &Value) -> Value {
        let Some(parsed) = SessionCommand::parse(command) else {
            return error_response(format!("Unknown command: {command}"));
        };

        let response = match parsed {
            SessionCommand::Create => self.create(params),
            SessionCommand::Reset => self.reset(params),
            SessionCommand::Extend => self.extend(params),
            SessionCommand::List => self.list(params),
            SessionCommand::Snapshot => self.snapshot(params),
            SessionCommand::Restore => self.restore(params),
            SessionCommand::Stats => self.stats(),
        };

        if let Some(message) = response.get("error").and_then(Value::as_str) {
            error!(command, error = message, "Session command failed");
        }
        response
    }

    fn create(&self, params: &Value) -> Value {
        let ttl = match secs_param(params, "ttl") {
            Ok(ttl) => ttl.filter(|secs| *secs > 0).map(Duration::from_secs),
            Err(response) => return response,
        };
        match self.manager.create_session(
            str_param(params, "owner"),
            ttl,
            str_param(params, "session_id"),
        ) {
            Ok(session_id) => json!({ "session_id": session_id, "status": "created" }),
            Err(err) => error_response(err.to_string()),
        }
    }

    fn reset(&self, params: &Value) -> Value {
        let Some(session_id) = str_param(params, "session_id") else {
            return missing("session_id");
        };
        let status = if self.manager.reset_session(session_id) {
            "reset"
        } else {
            "not_found"
        };
        json!({ "status": status })
    }

    fn extend(&self, params: &Value) -> Value {
        let Some(session_id) = str_param(params, "session_id") else {
            return missing("session_id");
        };
        let extra = match secs_param(params, "ttl") {
            Ok(secs) => Duration::from_secs(secs.unwrap_or(DEFAULT_EXTEND_SECS)),
            Err(response) => return response,
        };
        let status = if self.manager.extend_session(session_id, extra) {
            "extended"
        } else {
            "not_found"
        };
        json!({ "status": status })
    }

    fn list(&self, params: &Value) -> Value {
        let sessions = self.manager.list_sessions(str_param(params, "owner"));
        json!({ "count": sessions.len(), "sessions": sessions })
    }

    fn snapshot(&self, params: &Value) -> Value {
        let Some(session_id) = str_param(params, "session_id") else {
            return missing("session_id");
        };
        match self.manager.snapshot_session(session_id) {
            Some(snapshot) => serde_json::to_value(snapshot)
                .unwrap_or_else(|err| error_response(err.to_string())),
            None => error_response("Session not found"),
        }
    }

    fn restore(&self, params: &Value) -> Value {
        let snapshot = match params.get("snapshot") {
            None | Some(Value::Null) => return missing("snapshot"),
            Some(raw) => raw,
        };
        match serde_json::from_value::<SessionSnapshot>(snapshot.clone()) {
            Ok(snapshot) => {
                let session_id = self.manager.restore_session(&snapshot);
                json!({ "session_id": session_id, "status": "restored" })
            }
            Err(err) => error_response(format!("Invalid snapshot: {err}")),
        }
    }

    fn stats(&self) -> Value {
        serde_json::to_value(self.manager.stats())
            .unwrap_or_else(|err| error_response(err.to_string()))
    }
}
