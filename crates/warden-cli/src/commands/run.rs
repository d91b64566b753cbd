//! `warden run`

use anyhow::Context;
use std::sync::Arc;
use warden_core::sandbox::SandboxOrchestrator;
use warden_core::telemetry::MetricsCollector;
use warden_core::{ExecutionStatus, WardenConfig};

use crate::args::RunArgs;
use crate::console::CliConsole;

pub async fn execute(config: &WardenConfig, args: RunArgs) -> anyhow::Result<()> {
    let code = match (args.source.code, args.source.file) {
        (Some(code), _) => code,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read code from {:?}", path))?,
        (None, None) => anyhow::bail!("either --code or --file is required"),
    };

    let metrics = Arc::new(MetricsCollector::from_config(&config.telemetry));
    let orchestrator = SandboxOrchestrator::from_config(config)?.with_metrics(metrics);

    let result = orchestrator
        .execute(&code, args.tenant.as_deref(), args.session.as_deref())
        .await;

    CliConsole::new(false).json(&serde_json::to_value(&result)?);
    if result.status != ExecutionStatus::Success {
        anyhow::bail!("execution finished with status {}", result.status);
    }
    Ok(())
}
