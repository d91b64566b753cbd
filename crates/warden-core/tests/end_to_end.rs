//! End-to-end flows through the public API: configuration, orchestration,
//! audit persistence, intent execution and the session protocol.
//!
//! Flows that need a real interpreter return early when `python3` is not on
//! `PATH`.

use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use warden_core::capability::CapabilityRegistry;
use warden_core::config::load_config;
use warden_core::executor::{CodeExecutor, IntentRouter};
use warden_core::sandbox::{AuditLog, ExecutionStatus, SandboxOrchestrator};
use warden_core::session::{SessionConfig, SessionManager, SessionProtocol};
use warden_core::telemetry::MetricsCollector;
use warden_core::{BackendKind, WardenConfig};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warden_core=debug")
        .with_test_writer()
        .try_init();
}

fn python_available() -> bool {
    std::process::Command::new("python3")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Config file pinning every directory under `root` and using only the
/// process backend
fn write_config(root: &Path) -> WardenConfig {
    let path = root.join("warden.toml");
    let content = format!(
        r#"
[features]
execution_mode = "code_execution"
cache_ttl_seconds = 60

[policy]
path = "{policy}"

[sandbox]
preference = ["process"]

[cache]
backend = "disk"
disk_dir = "{cache}"

[audit]
directory = "{audit}"

[telemetry]
usage_log = "{usage}"
"#,
        policy = root.join("policies/default.json").display(),
        cache = root.join("cache").display(),
        audit = root.join("audit").display(),
        usage = root.join("usage.jsonl").display(),
    );
    std::fs::write(&path, content).unwrap();
    load_config(&path).unwrap()
}

#[test]
fn test_config_file_round_trip() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    assert_eq!(config.sandbox.preference, vec![BackendKind::Process]);
    assert_eq!(config.features.cache_ttl_seconds, 60);
    assert!(config.audit.directory.starts_with(temp.path()));
}

#[tokio::test]
async fn test_disallowed_import_is_audited_once() {
    init_tracing();
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    let orchestrator = SandboxOrchestrator::from_config(&config).unwrap();

    let result = orchestrator
        .execute("import socket\nsocket.socket()", Some("acme"), None)
        .await;

    assert_eq!(result.status, ExecutionStatus::PolicyViolation);
    assert_eq!(result.sandbox_used, None);

    let reader = AuditLog::new(&config.audit.directory);
    let persisted = reader
        .load_day(chrono::Utc::now().date_naive())
        .unwrap();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].status, ExecutionStatus::PolicyViolation);
    assert_eq!(persisted[0].sandbox_used, "none");
    assert_eq!(persisted[0].tenant_id.as_deref(), Some("acme"));
    assert_eq!(persisted[0].execution_id, result.execution_id);
}

#[tokio::test]
async fn test_intent_runs_in_process_sandbox() {
    init_tracing();
    if !python_available() {
        eprintln!("python3 not installed, skipping");
        return;
    }
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    let metrics = Arc::new(MetricsCollector::new());
    let executor = CodeExecutor::from_config(&config, metrics.clone()).unwrap();
    let registry = CapabilityRegistry::from_config(&config.capabilities).unwrap();
    let router = IntentRouter::new(Arc::new(executor), Arc::new(registry));

    let first = router.route("compute", &json!({"value": "16"})).await;
    assert_eq!(first["result"]["data"]["output"]["sqrt"], json!(4.0));
    assert_eq!(first["result"]["metadata"]["sandbox_used"], "process");
    assert_eq!(first["result"]["metadata"]["cache_hit"], false);

    let second = router.route("compute", &json!({"value": "16"})).await;
    assert_eq!(second["result"]["metadata"]["cache_hit"], true);
    assert_eq!(metrics.cache_hits.get(), 1);

    let usage = std::fs::read_to_string(temp.path().join("usage.jsonl")).unwrap();
    assert_eq!(usage.lines().count(), 2);
}

#[tokio::test]
async fn test_session_protocol_reset_clears_state() {
    let manager = Arc::new(SessionManager::new(SessionConfig::default()));
    let protocol = SessionProtocol::new(manager.clone());

    let created = protocol.execute_command("create", &json!({"owner": "ada"}));
    let session_id = created["session_id"].as_str().unwrap().to_string();

    let session = manager.get_session(&session_id).unwrap();
    assert!(session.set("k", json!("v")));

    let reset = protocol.execute_command("reset", &json!({"session_id": session_id}));
    assert_eq!(reset["status"], "reset");
    assert_eq!(manager.get_session(&session_id).unwrap().get("k"), None);

    let listed = protocol.execute_command("list", &json!({"owner": "ada"}));
    assert_eq!(listed["count"], 1);

    manager.shutdown().await;
}
