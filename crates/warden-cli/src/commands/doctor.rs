//! `warden doctor`

use colored::*;
use std::path::Path;
use warden_core::WardenConfig;
use warden_core::cache::CacheBackendKind;
use warden_core::policy::PolicyEngine;
use warden_core::sandbox::SandboxOrchestrator;

use crate::console::CliConsole;

/// Check item result for diagnostics
#[derive(Debug, Clone)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    message: String,
    hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

impl CheckResult {
    fn new(status: CheckStatus, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            message: message.into(),
            hint: None,
        }
    }

    fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(CheckStatus::Pass, name, message)
    }

    fn warn(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(CheckStatus::Warn, name, message)
    }

    fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(CheckStatus::Fail, name, message)
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    fn icon(&self) -> ColoredString {
        match self.status {
            CheckStatus::Pass => "✓".green().bold(),
            CheckStatus::Warn => "⚠".yellow().bold(),
            CheckStatus::Fail => "✗".red().bold(),
        }
    }
}

pub async fn execute(config_path: &Path, config: &WardenConfig) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    console.print_header("Warden Health Check");

    let mut checks = vec![check_config_file(config_path), check_policy(config)];
    checks.extend(check_backends(config).await);
    checks.push(check_directory("Audit directory", &config.audit.directory));
    if config.cache.backend == CacheBackendKind::Disk {
        checks.push(check_directory("Cache directory", &config.cache.disk_dir));
    }

    let mut fail_count = 0;
    let mut warn_count = 0;
    for check in &checks {
        println!("{} {} - {}", check.icon(), check.name.bold(), check.message);
        if let Some(hint) = &check.hint {
            println!("    {} {}", "→".dimmed(), hint.dimmed());
        }
        match check.status {
            CheckStatus::Pass => {}
            CheckStatus::Warn => warn_count += 1,
            CheckStatus::Fail => fail_count += 1,
        }
    }

    println!();
    println!(
        "Summary: {} passed, {} warnings, {} failed",
        (checks.len() - warn_count - fail_count).to_string().green(),
        warn_count.to_string().yellow(),
        fail_count.to_string().red()
    );

    if fail_count > 0 {
        anyhow::bail!("{fail_count} health checks failed");
    }
    console.success("Warden is ready to execute code.");
    Ok(())
}

fn check_config_file(path: &Path) -> CheckResult {
    if path.exists() {
        CheckResult::pass("Configuration", format!("Loaded {}", path.display()))
    } else {
        CheckResult::warn("Configuration", format!("{} not found, using defaults", path.display()))
            .with_hint("Pass --config or set WARDEN_CONFIG")
    }
}

fn check_policy(config: &WardenConfig) -> CheckResult {
    let path = &config.policy.path;
    match PolicyEngine::load(&config.policy) {
        Ok(engine) if !path.exists() => CheckResult::warn(
            "Policy",
            format!("No file at {}, built-in policy {} active", path.display(), engine.version()),
        )
        .with_hint("Create and sign one with `warden policy sign --key <seed>`"),
        Ok(engine) => CheckResult::pass(
            "Policy",
            format!("Version {} ({})", engine.version(), path.display()),
        ),
        Err(e) => CheckResult::fail("Policy", e.to_string()),
    }
}

async fn check_backends(config: &WardenConfig) -> Vec<CheckResult> {
    let orchestrator = match SandboxOrchestrator::from_config(config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => return vec![CheckResult::fail("Sandbox", e.to_string())],
    };

    let availability = orchestrator.backend_availability().await;
    let mut checks: Vec<CheckResult> = availability
        .iter()
        .map(|(kind, available)| {
            let name = format!("Backend {}", kind);
            if *available {
                CheckResult::pass(name, "available")
            } else {
                CheckResult::warn(name, "unavailable")
            }
        })
        .collect();

    match availability.iter().find(|(_, available)| *available) {
        Some((kind, _)) => checks.push(CheckResult::pass(
            "Sandbox",
            format!("Code will run on the {} backend", kind),
        )),
        None => checks.push(
            CheckResult::fail("Sandbox", "No backend available, all executions will be refused")
                .with_hint("Install docker or python3, or add a backend to sandbox.preference"),
        ),
    }
    checks
}

fn check_directory(name: &str, dir: &Path) -> CheckResult {
    if dir.is_dir() {
        CheckResult::pass(name, dir.display().to_string())
    } else if dir.exists() {
        CheckResult::fail(name, format!("{} is not a directory", dir.display()))
    } else {
        CheckResult::warn(name, format!("{} will be created on first use", dir.display()))
    }
}
