//! Mode-aware routing between capability tool routes and code execution

use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::flags::ExecutionMode;
use super::runner::{CodeExecutor, RequestScope, estimate_tokens};
use crate::capability::CapabilityRegistry;
use crate::telemetry::{TOOL_ROUTE_MODE, TokenUsage};

/// Intents cheap enough to answer from the tool route in hybrid mode
const SIMPLE_INTENTS: &[&str] = &["list_errors", "get_issue_count"];

/// Which path served a routed intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Tools,
    Code,
}

/// Front door for intents
///
/// Tool routes and their token estimates come from the capability registry.
pub struct IntentRouter {
    executor: Arc<CodeExecutor>,
    registry: Arc<CapabilityRegistry>,
}

impl IntentRouter {
    pub fn new(executor: Arc<CodeExecutor>, registry: Arc<CapabilityRegistry>) -> Self {
        Self { executor, registry }
    }

    pub fn executor(&self) -> &Arc<CodeExecutor> {
        &self.executor
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    pub fn mode(&self) -> ExecutionMode {
        self.executor.flags().execution_mode
    }

    /// Path an intent takes under the current mode
    pub fn route_for(&self, intent: &str) -> Route {
        match self.mode() {
            ExecutionMode::McpOnly => Route::Tools,
            ExecutionMode::CodeExecution => Route::Code,
            ExecutionMode::Hybrid if SIMPLE_INTENTS.contains(&intent) => Route::Tools,
            ExecutionMode::Hybrid => Route::Code,
        }
    }

    pub async fn route(&self, intent: &str, params: &Value) -> Value {
        self.route_scoped(intent, params, &RequestScope::default())
            .await
    }

    pub async fn route_scoped(&self, intent: &str, params: &Value, scope: &RequestScope) -> Value {
        let route = self.route_for(intent);
        info!(intent, mode = %self.mode(), ?route, "Routing request");
        match route {
            Route::Tools => {
                let start = Instant::now();
                let response = self.route_to_tools(intent);
                self.record_tool_usage(intent, params, scope, &response, start);
                response
            }
            Route::Code => self
                .executor
                .execute_scoped(intent, params, scope)
                .await
                .to_value(),
        }
    }

    /// Tools an intent needs and what loading them costs, without executing anything
    ///
    /// An intent no capability routes gets an empty tool list and a null
    /// capability; its estimate is the manifest alone.
    pub fn route_to_tools(&self, intent: &str) -> Value {
        match self.registry.route(intent) {
            Some(route) => json!({
                "mode": TOOL_ROUTE_MODE,
                "intent": intent,
                "capability": route.capability,
                "tools": route.tools,
                "estimated_tokens": route.estimated_tokens,
            }),
            None => json!({
                "mode": TOOL_ROUTE_MODE,
                "intent": intent,
                "capability": null,
                "tools": [],
                "estimated_tokens": self.registry.manifest_tokens(),
            }),
        }
    }

    fn record_tool_usage(
        &self,
        intent: &str,
        params: &Value,
        scope: &RequestScope,
        response: &Value,
        start: Instant,
    ) {
        let Some(usage) = self.executor.usage_log() else {
            return;
        };
        let input_tokens = estimate_tokens(intent, params);
        let output_tokens = response["estimated_tokens"].as_u64().unwrap_or(0);
        let mut record = TokenUsage::new(
            intent,
            TOOL_ROUTE_MODE,
            input_tokens,
            output_tokens,
            start.elapsed().as_secs_f64() * 1000.0,
        )
        .with_session(scope.session_id.clone());
        if response["capability"].is_null() {
            record = record.failed(format!("No capability routes intent '{}'", intent));
        }
        if let Err(e) = usage.record(record) {
            warn!("Failed to record token usage: {}", e);
        }
    }
}
