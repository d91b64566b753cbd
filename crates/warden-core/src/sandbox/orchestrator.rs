//! Policy-checked, audited dispatch across the backend preference list

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

use super::SandboxBackend;
use super::audit::{AuditEntry, AuditLog, ComplianceReport, GovernanceReport};
use super::backends::{KILL_TIMEOUT, build_backends};
use super::process::DRAIN_TIMEOUT;
use super::tenant::TenantContexts;
use super::types::{BackendKind, ExecutionRequest, ExecutionResult, ExecutionStatus};
use crate::config::WardenConfig;
use crate::error::WardenResult;
use crate::policy::PolicyEngine;
use crate::redact::SecretRedactor;
use crate::telemetry::{MetricsSink, NoopMetrics, UsageLog, names};

/// Extra wall-clock time a backend gets over the request timeout before the
/// orchestrator abandons it
///
/// Covers the post-timeout output drain and `docker kill`, so a timed-out
/// container is torn down by its backend before the task can be aborted.
pub(crate) const DISPATCH_GRACE: Duration = DRAIN_TIMEOUT
    .saturating_add(KILL_TIMEOUT)
    .saturating_add(Duration::from_secs(5));

/// Single entry point for running untrusted code
///
/// Every call produces exactly one audit entry, whatever the outcome.
pub struct SandboxOrchestrator {
    policy: Arc<PolicyEngine>,
    backends: Vec<Arc<dyn SandboxBackend>>,
    audit: Arc<AuditLog>,
    metrics: Arc<dyn MetricsSink>,
    tenants: TenantContexts,
}

impl SandboxOrchestrator {
    pub fn new(
        policy: Arc<PolicyEngine>,
        backends: Vec<Arc<dyn SandboxBackend>>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            policy,
            backends,
            audit,
            metrics: Arc::new(NoopMetrics),
            tenants: TenantContexts::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Orchestrator with the configured policy, backends and audit directory
    pub fn from_config(config: &WardenConfig) -> WardenResult<Self> {
        let policy = PolicyEngine::load(&config.policy)?;
        let backends = build_backends(&config.sandbox);
        let audit = AuditLog::new(&config.audit.directory);

        info!(
            policy_version = %policy.version(),
            backends = ?backends.iter().map(|b| b.kind()).collect::<Vec<_>>(),
            "Sandbox orchestrator initialized"
        );
        Ok(Self::new(Arc::new(policy), backends, Arc::new(audit)))
    }

    pub fn policy(&self) -> &Arc<PolicyEngine> {
        &self.policy
    }

    pub fn audit(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    /// Run `code` under the current policy's limits
    pub async fn execute(
        &self,
        code: &str,
        tenant_id: Option<&str>,
        session_id: Option<&str>,
    ) -> ExecutionResult {
        let limits = self.policy.get_limits();
        let mut request = ExecutionRequest::new(code, limits.timeout, limits.memory_mb);
        request.network_allowed = limits.network;
        request.tenant_id = tenant_id.map(str::to_string);
        request.session_id = session_id.map(str::to_string);
        self.execute_request(request).await
    }

    /// Validate, dispatch, redact and audit one request
    #[instrument(skip_all, fields(tenant = ?request.tenant_id, session = ?request.session_id))]
    pub async fn execute_request(&self, request: ExecutionRequest) -> ExecutionResult {
        let execution_id = uuid::Uuid::new_v4().to_string();
        let start = Instant::now();
        let policy_version = self.policy.version();

        let validation = self.policy.validate(&request.code);
        let mut result = if validation.approved {
            self.dispatch(&request).await
        } else {
            let reason = validation.violation_reason.unwrap_or_default();
            for violation in &validation.violations {
                self.metrics
                    .increment(names::SANDBOX_REJECTIONS, &[("reason", violation.kind())]);
            }
            warn!(execution_id = %execution_id, "Policy violation: {}", reason);
            ExecutionResult::policy_violation(reason)
        };

        result.stdout = SecretRedactor::redact(&result.stdout);
        result.stderr = SecretRedactor::redact(&result.stderr);
        result.execution_id = execution_id;
        result.duration_ms = start.elapsed().as_millis() as u64;

        self.record_metrics(&result, start.elapsed());
        self.finish(&request, &policy_version, result)
    }

    /// First backend in preference order that reports itself available
    ///
    /// Every skipped backend is logged, so falling back to weaker isolation is
    /// never silent.
    pub async fn select_backend(&self) -> Option<Arc<dyn SandboxBackend>> {
        let mut skipped: Vec<BackendKind> = Vec::new();
        for backend in &self.backends {
            if backend.available().await {
                if !skipped.is_empty() {
                    warn!(
                        "Sandbox backends {:?} unavailable, falling back to {}",
                        skipped,
                        backend.kind()
                    );
                }
                if backend.kind() == BackendKind::Process {
                    warn!("Running code under OS resource limits only, without kernel isolation");
                }
                return Some(Arc::clone(backend));
            }
            debug!("Sandbox backend {} unavailable", backend.kind());
            skipped.push(backend.kind());
        }
        None
    }

    /// Availability of every configured backend, in preference order
    ///
    /// Backends are checked concurrently.
    pub async fn backend_availability(&self) -> Vec<(BackendKind, bool)> {
        let checks = self
            .backends
            .iter()
            .map(|backend| async move { (backend.kind(), backend.available().await) });
        futures::future::join_all(checks).await
    }

    async fn dispatch(&self, request: &ExecutionRequest) -> ExecutionResult {
        let Some(backend) = self.select_backend().await else {
            error!("No sandbox backend available; refusing to run code");
            self.metrics
                .increment(names::SANDBOX_REJECTIONS, &[("reason", "sandbox_unavailable")]);
            return ExecutionResult::sandbox_unavailable();
        };
        let kind = backend.kind();
        let deadline = request.timeout() + DISPATCH_GRACE;
        let owned = request.clone();

        // A panicking backend must not take the caller down with it.
        let handle = tokio::spawn(async move { backend.execute(&owned).await });
        let abort = handle.abort_handle();

        match timeout(deadline, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!("Sandbox backend {} task failed: {}", kind, e);
                ExecutionResult::error(Some(kind), format!("Backend task failed: {}", e))
            }
            Err(_) => {
                abort.abort();
                error!("Sandbox backend {} did not return within {:?}", kind, deadline);
                ExecutionResult::error(Some(kind), "Backend did not return in time")
            }
        }
    }

    fn record_metrics(&self, result: &ExecutionResult, elapsed: Duration) {
        self.metrics
            .observe(names::EXECUTION_DURATION_SECONDS, elapsed.as_secs_f64());
        match result.status {
            ExecutionStatus::Timeout => self.metrics.increment(names::SANDBOX_TIMEOUTS, &[]),
            ExecutionStatus::Error => self
                .metrics
                .increment(names::ERRORS, &[("type", "sandbox_error")]),
            _ => {}
        }
    }

    fn finish(
        &self,
        request: &ExecutionRequest,
        policy_version: &str,
        result: ExecutionResult,
    ) -> ExecutionResult {
        let entry = AuditEntry::for_result(
            &request.code,
            request.tenant_id.as_deref(),
            request.session_id.as_deref(),
            policy_version,
            &result,
        );

        match self.audit.record(entry) {
            Ok(()) => {
                info!(
                    execution_id = %result.execution_id,
                    status = %result.status,
                    sandbox = result.sandbox_label(),
                    duration_ms = result.duration_ms,
                    "Execution finished"
                );
                result
            }
            Err(e) => {
                error!(execution_id = %result.execution_id, "Failed to persist audit entry: {}", e);
                self.metrics
                    .increment(names::ERRORS, &[("type", "audit_persist")]);

                let mut failed = ExecutionResult::error(result.sandbox_used, "Execution failed");
                failed.execution_id = result.execution_id;
                failed.duration_ms = result.duration_ms;
                self.audit.push_unpersisted(AuditEntry::for_result(
                    &request.code,
                    request.tenant_id.as_deref(),
                    request.session_id.as_deref(),
                    policy_version,
                    &failed,
                ));
                failed
            }
        }
    }

    pub fn compliance_report(&self) -> ComplianceReport {
        ComplianceReport::from_entries(&self.audit.entries())
    }

    /// Usage distributions from `usage` next to this orchestrator's audit trail
    pub fn governance_report(&self, usage: &UsageLog) -> GovernanceReport {
        GovernanceReport::new(usage, &self.audit.entries(), self.audit.directory())
    }

    pub fn tenant_context(&self, tenant_id: &str) -> serde_json::Map<String, serde_json::Value> {
        self.tenants.get(tenant_id)
    }

    pub fn set_tenant_value(&self, tenant_id: &str, key: &str, value: serde_json::Value) {
        self.tenants.set_value(tenant_id, key, value);
    }

    pub fn clear_tenant_context(&self, tenant_id: &str) -> bool {
        self.tenants.clear(tenant_id)
    }
}
