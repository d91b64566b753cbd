//! Executor and router behaviour over a stub backend

use super::*;
use crate::cache::ContextManager;
use crate::capability::CapabilityRegistry;
use crate::executor::codegen::MockCodeGenerator;
use crate::policy::PolicyEngine;
use crate::sandbox::{
    AuditLog, BackendKind, ExecutionRequest, ExecutionResult, ExecutionStatus, SandboxBackend,
    SandboxOrchestrator,
};
use crate::telemetry::{MetricsCollector, UsageLog};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Backend that records calls and answers with a fixed outcome
struct StubBackend {
    status: ExecutionStatus,
    stdout: String,
    calls: AtomicUsize,
}

impl StubBackend {
    fn printing(stdout: &str) -> Arc<Self> {
        Arc::new(Self {
            status: ExecutionStatus::Success,
            stdout: stdout.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(status: ExecutionStatus) -> Arc<Self> {
        Arc::new(Self {
            status,
            stdout: String::new(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SandboxBackend for StubBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Process
    }

    async fn available(&self) -> bool {
        true
    }

    async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.status {
            ExecutionStatus::Success => ExecutionResult::completed(
                BackendKind::Process,
                self.stdout.clone(),
                String::new(),
                Some(0),
            ),
            ExecutionStatus::Timeout => ExecutionResult::timed_out(
                BackendKind::Process,
                request.timeout(),
                String::new(),
                String::new(),
            ),
            _ => ExecutionResult::error(Some(BackendKind::Process), "backend fault"),
        }
    }
}

fn flags(mode: ExecutionMode) -> FeatureFlags {
    FeatureFlags {
        execution_mode: mode,
        ..FeatureFlags::default()
    }
}

fn executor(flags: FeatureFlags, backend: Arc<StubBackend>) -> CodeExecutor {
    let orchestrator = SandboxOrchestrator::new(
        Arc::new(PolicyEngine::default()),
        vec![backend],
        Arc::new(AuditLog::in_memory()),
    );
    CodeExecutor::new(flags, Arc::new(orchestrator))
}

fn intent_router(exec: CodeExecutor) -> IntentRouter {
    let registry = CapabilityRegistry::with_builtins(b"router-test-secret".to_vec()).unwrap();
    IntentRouter::new(Arc::new(exec), Arc::new(registry))
}

#[test]
fn test_estimate_tokens() {
    let params = json!({"project": "web"});
    let expected = serde_json::to_vec(&json!({"intent": "list_errors", "params": params}))
        .unwrap()
        .len() as u64
        / 4;
    assert_eq!(estimate_tokens("list_errors", &params), expected);
}

#[tokio::test]
async fn test_success_envelope_parses_json_output() {
    let backend = StubBackend::printing("{\"count\": 3}\n");
    let exec = executor(flags(ExecutionMode::CodeExecution), backend.clone());

    let envelope = exec
        .execute_intent("get_issue_count", &json!({"project": "web"}))
        .await;
    let result = envelope.result.unwrap();
    assert_eq!(result.data["output"], json!({"count": 3}));
    assert_eq!(result.data["exit_code"], json!(0));
    assert!(!result.metadata.cache_hit);
    assert_eq!(result.metadata.sandbox_used.as_deref(), Some("process"));
    assert!(result.metadata.execution_id.is_some());
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_token_limit_rejects_before_execution() {
    let backend = StubBackend::printing("1");
    let metrics = Arc::new(MetricsCollector::new());
    let mut generator = MockCodeGenerator::new();
    generator.expect_generate().never();
    let exec = executor(
        FeatureFlags {
            max_tokens_per_request: 5,
            ..flags(ExecutionMode::CodeExecution)
        },
        backend.clone(),
    )
    .with_generator(Arc::new(generator))
    .with_metrics(metrics.clone());

    let envelope = exec
        .execute_intent("list_errors", &json!({"project": "a-rather-long-project-name"}))
        .await;
    assert_eq!(envelope.error_code(), Some(429));
    assert_eq!(envelope.error.unwrap().data.mode, ExecutionMode::CodeExecution);
    assert_eq!(backend.calls(), 0);
    assert_eq!(metrics.token_limit_exceeded.get(), 1);
}

#[tokio::test]
async fn test_cache_hit_skips_backend() {
    let backend = StubBackend::printing("[1, 2]");
    let metrics = Arc::new(MetricsCollector::new());
    let exec = executor(flags(ExecutionMode::CodeExecution), backend.clone())
        .with_cache(Arc::new(ContextManager::in_memory(Duration::from_secs(60), 100)))
        .with_metrics(metrics.clone());
    let params = json!({"project": "web"});

    let first = exec.execute_intent("list_errors", &params).await;
    let second = exec.execute_intent("list_errors", &params).await;

    assert_eq!(backend.calls(), 1);
    let first = first.result.unwrap();
    let second = second.result.unwrap();
    assert!(!first.metadata.cache_hit);
    assert!(second.metadata.cache_hit);
    assert_eq!(first.data, second.data);
    assert_eq!(metrics.cache_hits.get(), 1);
    assert_eq!(metrics.cache_misses.get(), 1);
}

#[tokio::test]
async fn test_cache_ignored_when_disabled() {
    let backend = StubBackend::printing("ok");
    let exec = executor(
        FeatureFlags {
            enable_caching: false,
            ..flags(ExecutionMode::CodeExecution)
        },
        backend.clone(),
    )
    .with_cache(Arc::new(ContextManager::in_memory(Duration::from_secs(60), 100)));

    exec.execute_intent("compute", &json!({"value": "4"})).await;
    exec.execute_intent("compute", &json!({"value": "4"})).await;
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_status_maps_to_error_code() {
    for (status, code) in [(ExecutionStatus::Timeout, 408), (ExecutionStatus::Error, 500)] {
        let exec = executor(flags(ExecutionMode::CodeExecution), StubBackend::failing(status));
        let envelope = exec.execute_intent("compute", &json!({"value": "2"})).await;
        assert_eq!(envelope.error_code(), Some(code), "{status}");
    }
}

#[tokio::test]
async fn test_policy_violation_is_403() {
    let mut generator = MockCodeGenerator::new();
    generator
        .expect_generate()
        .times(1)
        .returning(|_, _| Ok("import socket".to_string()));

    let backend = StubBackend::printing("never");
    let exec = executor(flags(ExecutionMode::CodeExecution), backend.clone())
        .with_generator(Arc::new(generator));
    let envelope = exec.execute_intent("anything", &json!({})).await;

    let error = envelope.error.unwrap();
    assert_eq!(error.code, 403);
    assert!(error.message.contains("socket"));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_unknown_intent_is_error_envelope() {
    let backend = StubBackend::printing("never");
    let exec = executor(flags(ExecutionMode::CodeExecution), backend.clone());
    let envelope = exec.execute_intent("launch_rockets", &json!({})).await;
    assert_eq!(envelope.error_code(), Some(500));
    assert!(envelope.error.unwrap().message.contains("Unknown intent"));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_usage_log_records_each_request() {
    let usage = Arc::new(UsageLog::in_memory());
    let exec = executor(flags(ExecutionMode::CodeExecution), StubBackend::printing("1"))
        .with_usage_log(usage.clone());

    let scope = RequestScope::new(None, Some("sess-1".into()));
    exec.execute_scoped("compute", &json!({"value": "1"}), &scope).await;
    exec.execute_scoped("nope", &json!({}), &scope).await;

    let records = usage.records();
    assert_eq!(records.len(), 2);
    assert!(records[0].success);
    assert_eq!(records[0].session_id.as_deref(), Some("sess-1"));
    assert_eq!(records[0].mode, "code_execution");
    assert!(!records[1].success);
}

#[tokio::test]
async fn test_router_modes() {
    let backend = StubBackend::printing("{}");
    let router = intent_router(executor(flags(ExecutionMode::McpOnly), backend.clone()));
    let response = router.route("analyze_error", &json!({"error_id": "E1"})).await;
    assert_eq!(response["mode"], "mcp");
    assert_eq!(response["capability"], "sentry");
    assert_eq!(response["tools"], json!(["sentry.get_trace", "sentry.analyze"]));
    assert_eq!(backend.calls(), 0);

    let router = intent_router(executor(flags(ExecutionMode::Hybrid), backend.clone()));
    assert_eq!(router.route_for("list_errors"), Route::Tools);
    assert_eq!(router.route_for("get_issue_count"), Route::Tools);
    assert_eq!(router.route_for("analyze_error"), Route::Code);

    let response = router.route("analyze_error", &json!({"error_id": "E1"})).await;
    assert_eq!(response["jsonrpc"], "2.0");
    assert_eq!(backend.calls(), 1);

    let router = intent_router(executor(flags(ExecutionMode::CodeExecution), backend.clone()));
    assert_eq!(router.route_for("list_errors"), Route::Code);
}

#[tokio::test]
async fn test_tool_route_estimate_comes_from_registry() {
    let usage = Arc::new(UsageLog::in_memory());
    let exec = executor(flags(ExecutionMode::McpOnly), StubBackend::printing("never"))
        .with_usage_log(usage.clone());
    let router = intent_router(exec);
    let expected = router.registry().estimate_total_load(&["github"]);

    let response = router.route("create_issue", &json!({"title": "t"})).await;
    assert_eq!(response["capability"], "github");
    assert_eq!(response["estimated_tokens"], json!(expected));

    let unknown = router.route("launch_rockets", &json!({})).await;
    assert!(unknown["capability"].is_null());
    assert_eq!(unknown["tools"], json!([]));
    assert_eq!(
        unknown["estimated_tokens"],
        json!(router.registry().manifest_tokens())
    );

    let records = usage.records();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.mode == crate::telemetry::TOOL_ROUTE_MODE));
    assert_eq!(records[0].output_tokens, expected as u64);
    assert!(records[0].success);
    assert!(!records[1].success);
}

#[tokio::test]
async fn test_hybrid_usage_split_by_route() {
    let usage = Arc::new(UsageLog::in_memory());
    let exec = executor(flags(ExecutionMode::Hybrid), StubBackend::printing("{}"))
        .with_usage_log(usage.clone());
    let router = intent_router(exec);

    router.route("list_errors", &json!({})).await;
    router.route("compute", &json!({"value": "4"})).await;

    let by_mode = usage.percentiles_by_mode();
    assert_eq!(by_mode["mcp"].sample_size, 1);
    assert_eq!(by_mode["code_execution"].sample_size, 1);
}
