//! Intent execution: budget check, cache, code generation and sandbox dispatch

use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::codegen::{CodeGenerator, TemplateGenerator};
use super::flags::FeatureFlags;
use super::response::{Envelope, ErrorCode, ResponseMetadata};
use crate::cache::{ContextManager, cache_key};
use crate::config::WardenConfig;
use crate::error::WardenResult;
use crate::sandbox::{ExecutionResult, ExecutionStatus, SandboxOrchestrator};
use crate::telemetry::{
    CODE_EXECUTION_MODE, MetricsSink, NoopMetrics, TokenUsage, UsageLog, names,
};

/// Rough token estimate: four bytes of the JSON request per token
pub fn estimate_tokens(intent: &str, params: &Value) -> u64 {
    let request = json!({ "intent": intent, "params": params });
    serde_json::to_vec(&request)
        .map(|bytes| bytes.len() as u64 / 4)
        .unwrap_or(u64::MAX)
}

/// Caller identity attached to an execution
#[derive(Debug, Clone, Default)]
pub struct RequestScope {
    pub tenant_id: Option<String>,
    pub session_id: Option<String>,
}

impl RequestScope {
    pub fn new(tenant_id: Option<String>, session_id: Option<String>) -> Self {
        Self {
            tenant_id,
            session_id,
        }
    }
}

/// Turns an intent into a sandboxed execution and a response envelope
pub struct CodeExecutor {
    flags: FeatureFlags,
    orchestrator: Arc<SandboxOrchestrator>,
    generator: Arc<dyn CodeGenerator>,
    cache: Option<Arc<ContextManager>>,
    metrics: Arc<dyn MetricsSink>,
    usage: Option<Arc<UsageLog>>,
}

impl CodeExecutor {
    pub fn new(flags: FeatureFlags, orchestrator: Arc<SandboxOrchestrator>) -> Self {
        if !flags.enable_sandbox {
            warn!("enable_sandbox is off; code still runs through the sandbox orchestrator");
        }
        Self {
            flags,
            orchestrator,
            generator: Arc::new(TemplateGenerator::new()),
            cache: None,
            metrics: Arc::new(NoopMetrics),
            usage: None,
        }
    }

    /// Executor wired from configuration
    ///
    /// `metrics` is shared with the orchestrator; it is replaced by a no-op
    /// sink when metrics are disabled.
    pub fn from_config(config: &WardenConfig, metrics: Arc<dyn MetricsSink>) -> WardenResult<Self> {
        let flags = config.features.clone();
        let metrics: Arc<dyn MetricsSink> = if flags.enable_metrics {
            metrics
        } else {
            Arc::new(NoopMetrics)
        };

        let orchestrator = SandboxOrchestrator::from_config(config)?.with_metrics(metrics.clone());
        let mut executor = Self::new(flags.clone(), Arc::new(orchestrator)).with_metrics(metrics);

        if flags.enable_caching {
            let cache = ContextManager::new(
                &config.cache,
                flags.cache_ttl(),
                flags.context_size_limit_kb,
            )?;
            executor = executor.with_cache(Arc::new(cache));
        }
        if let Some(path) = &config.telemetry.usage_log {
            executor = executor.with_usage_log(Arc::new(UsageLog::new(Some(path.clone()))));
        }
        Ok(executor)
    }

    pub fn with_generator(mut self, generator: Arc<dyn CodeGenerator>) -> Self {
        self.generator = generator;
        self
    }

    /// Cache results; ignored unless caching is enabled in the flags
    pub fn with_cache(mut self, cache: Arc<ContextManager>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_usage_log(mut self, usage: Arc<UsageLog>) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn flags(&self) -> &FeatureFlags {
        &self.flags
    }

    pub fn orchestrator(&self) -> &Arc<SandboxOrchestrator> {
        &self.orchestrator
    }

    pub fn usage_log(&self) -> Option<&Arc<UsageLog>> {
        self.usage.as_ref()
    }

    pub fn cache(&self) -> Option<&Arc<ContextManager>> {
        self.cache.as_ref().filter(|_| self.flags.enable_caching)
    }

    fn error(&self, code: ErrorCode, message: impl Into<String>) -> Envelope {
        Envelope::error(
            code,
            message,
            self.flags.execution_mode,
            self.flags.enable_sandbox,
        )
    }

    pub async fn execute_intent(&self, intent: &str, params: &Value) -> Envelope {
        self.execute_scoped(intent, params, &RequestScope::default())
            .await
    }

    /// Serve one intent on behalf of a tenant or session
    #[instrument(skip(self, params, scope), fields(mode = %self.flags.execution_mode))]
    pub async fn execute_scoped(
        &self,
        intent: &str,
        params: &Value,
        scope: &RequestScope,
    ) -> Envelope {
        let start = Instant::now();
        let tokens = estimate_tokens(intent, params);

        if tokens > self.flags.max_tokens_per_request as u64 {
            warn!(
                tokens,
                limit = self.flags.max_tokens_per_request,
                "Request exceeds token budget"
            );
            self.metrics.increment(names::TOKEN_LIMIT_EXCEEDED, &[]);
            self.record_usage(intent, scope, tokens, 0, start, Some("Token limit exceeded"));
            return self.error(ErrorCode::TokenLimit, "Token limit exceeded");
        }

        let key = cache_key(intent, params);
        if let Some(cache) = self.cache() {
            if let Some(data) = cache.get(&key).await {
                debug!("Cache hit");
                self.metrics.increment(names::CACHE_HITS, &[]);
                self.metrics
                    .increment(names::EXECUTIONS, &[("intent", intent), ("status", "cache_hit")]);
                self.record_usage(intent, scope, tokens, 0, start, None);
                return Envelope::success(data, self.metadata(tokens, start, true, None));
            }
            self.metrics.increment(names::CACHE_MISSES, &[]);
        }

        let code = match self.generator.generate(intent, params) {
            Ok(code) => code,
            Err(e) => {
                warn!("Code generation failed: {}", e);
                self.metrics.increment(names::ERRORS, &[("type", "codegen")]);
                self.record_usage(intent, scope, tokens, 0, start, Some(&e.to_string()));
                return self.error(ErrorCode::Internal, e.to_string());
            }
        };

        let result = self
            .orchestrator
            .execute(&code, scope.tenant_id.as_deref(), scope.session_id.as_deref())
            .await;

        self.metrics.observe(names::TOKENS_USED, tokens as f64);
        self.metrics.increment(
            names::EXECUTIONS,
            &[("intent", intent), ("status", result.status.as_str())],
        );
        let output_tokens = result.stdout.len() as u64 / 4;

        if result.status != ExecutionStatus::Success {
            let message = result
                .message
                .clone()
                .unwrap_or_else(|| result.status.to_string());
            self.record_usage(intent, scope, tokens, output_tokens, start, Some(&message));
            return self.error(ErrorCode::for_status(result.status), message);
        }

        let data = result_data(&result);
        if let Some(cache) = self.cache() {
            if result.exit_code.unwrap_or(0) == 0 && !cache.set(&key, data.clone()).await {
                debug!("Result not cached");
            }
        }
        self.record_usage(intent, scope, tokens, output_tokens, start, None);

        info!(
            execution_id = %result.execution_id,
            tokens,
            duration_ms = result.duration_ms,
            "Intent executed"
        );
        Envelope::success(data, self.metadata(tokens, start, false, Some(&result)))
    }

    fn metadata(
        &self,
        tokens: u64,
        start: Instant,
        cache_hit: bool,
        result: Option<&ExecutionResult>,
    ) -> ResponseMetadata {
        ResponseMetadata {
            tokens_used: tokens,
            execution_time_ms: start.elapsed().as_millis() as u64,
            cache_hit,
            mode: self.flags.execution_mode,
            execution_id: result.map(|r| r.execution_id.clone()),
            sandbox_used: result.and_then(|r| r.sandbox_used.map(|kind| kind.to_string())),
        }
    }

    fn record_usage(
        &self,
        intent: &str,
        scope: &RequestScope,
        input_tokens: u64,
        output_tokens: u64,
        start: Instant,
        error: Option<&str>,
    ) {
        let Some(usage) = &self.usage else {
            return;
        };
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        let mut record = TokenUsage::new(
            intent,
            CODE_EXECUTION_MODE,
            input_tokens,
            output_tokens,
            latency_ms,
        )
        .with_session(scope.session_id.clone());
        if let Some(error) = error {
            record = record.failed(error);
        }
        if let Err(e) = usage.record(record) {
            warn!("Failed to record token usage: {}", e);
        }
    }
}

/// Response payload for a completed execution
///
/// Stdout that parses as JSON is returned structured, otherwise as text.
fn result_data(result: &ExecutionResult) -> Value {
    let stdout = result.stdout.trim();
    let output = serde_json::from_str::<Value>(stdout)
        .unwrap_or_else(|_| Value::String(stdout.to_string()));
    let mut data = json!({ "output": output, "exit_code": result.exit_code });
    if !result.stderr.is_empty() {
        data["stderr"] = Value::String(result.stderr.clone());
    }
    data
}
