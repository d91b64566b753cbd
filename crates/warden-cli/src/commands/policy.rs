//! `warden policy`

use anyhow::Context;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use std::path::Path;
use warden_core::WardenConfig;
use warden_core::policy::{ExecutionPolicy, PolicyEngine, decode_signing_key, sign_policy};

use crate::args::PolicyAction;
use crate::console::CliConsole;

pub fn execute(config: &WardenConfig, action: PolicyAction) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    match action {
        PolicyAction::Show => {
            let engine = PolicyEngine::load(&config.policy)?;
            console.json(&serde_json::to_value(engine.policy().as_ref())?);
        }
        PolicyAction::Verify => {
            if config.policy.trusted_key.is_none() {
                console.warn("No trusted key configured; only unsigned policies can load");
            }
            let engine = PolicyEngine::load(&config.policy)?;
            console.success(&format!(
                "Policy {:?} version {} verified",
                config.policy.path,
                engine.version()
            ));
        }
        PolicyAction::Sign { key } => {
            let seed = std::fs::read_to_string(&key)
                .with_context(|| format!("Failed to read signing key {:?}", key))?;
            let signing_key = decode_signing_key(&seed)?;

            let policy = read_unverified(&config.policy.path)?;
            let signed = sign_policy(&policy, &signing_key);
            write_policy(&config.policy.path, &signed)?;

            console.success(&format!("Signed policy {:?}", config.policy.path));
            println!(
                "trusted_key = \"{}\"",
                BASE64.encode(signing_key.verifying_key().to_bytes())
            );
        }
        PolicyAction::Digest => {
            let policy = read_unverified(&config.policy.path)?;
            println!("{}", policy.content_digest());
        }
    }
    Ok(())
}

/// Policy file contents without signature checks; default policy when absent
fn read_unverified(path: &Path) -> anyhow::Result<ExecutionPolicy> {
    if !path.exists() {
        return Ok(ExecutionPolicy::default());
    }
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
}

fn write_policy(path: &Path, policy: &ExecutionPolicy) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {:?}", parent))?;
    }
    std::fs::write(path, serde_json::to_string_pretty(policy)?)
        .with_context(|| format!("Failed to write {:?}", path))
}
