//! `warden report`

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use warden_core::WardenConfig;
use warden_core::sandbox::{AuditLog, ComplianceReport, GovernanceReport};
use warden_core::telemetry::UsageLog;

use crate::console::CliConsole;

pub fn execute(config: &WardenConfig, date: Option<&str>, governance: bool) -> anyhow::Result<()> {
    let console = CliConsole::new(false);
    let day = match date {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .with_context(|| format!("Invalid --date {raw}, expected YYYY-MM-DD"))?,
        None => Utc::now().date_naive(),
    };

    let audit = AuditLog::new(&config.audit.directory);
    let entries = audit.load_day(day)?;
    tracing::debug!("Loaded {} audit entries for {}", entries.len(), day);

    let report = if governance {
        let usage = match &config.telemetry.usage_log {
            Some(path) => UsageLog::load(path)
                .with_context(|| format!("Failed to load usage log {}", path.display()))?,
            None => {
                console.warn("telemetry.usage_log is not set; usage distributions are empty");
                UsageLog::in_memory()
            }
        };
        let report = GovernanceReport::new(&usage, &entries, audit.directory());
        serde_json::to_value(&report)?
    } else {
        serde_json::to_value(ComplianceReport::from_entries(&entries))?
    };
    console.json(&report);
    Ok(())
}
