//! `warden intent`

use std::sync::Arc;
use warden_core::WardenConfig;
use warden_core::capability::CapabilityRegistry;
use warden_core::executor::{CodeExecutor, IntentRouter, RequestScope};
use warden_core::telemetry::MetricsCollector;

use super::parse_params;
use crate::console::CliConsole;

pub async fn execute(
    config: &WardenConfig,
    name: &str,
    params: &str,
    tenant: Option<String>,
    session: Option<String>,
    verbose: bool,
) -> anyhow::Result<()> {
    let console = CliConsole::new(verbose);
    let params = parse_params(params)?;

    let metrics = Arc::new(MetricsCollector::from_config(&config.telemetry));
    let executor = CodeExecutor::from_config(config, metrics.clone())?;
    let registry = CapabilityRegistry::from_config(&config.capabilities)?;
    let router = IntentRouter::new(Arc::new(executor), Arc::new(registry));
    console.info(&format!("Execution mode: {}", router.mode()));

    let response = router
        .route_scoped(name, &params, &RequestScope::new(tenant, session))
        .await;
    console.json(&response);

    if verbose {
        eprintln!("{}", metrics.summary());
        for alert in metrics.alerts() {
            console.warn(&alert.to_string());
        }
    }
    Ok(())
}
