//! Warden CLI application
//!
//! Front end over `warden-core`: run code through the sandbox orchestrator,
//! route intents, drive the session protocol, manage signed policies and
//! inspect the audit trail.
//!
//! ```bash
//! warden run --code "print(2 + 2)"
//! warden intent compute --params '{"value": "16"}'
//! warden policy sign --key ~/.warden/policy.seed
//! warden doctor
//! ```

mod args;
mod commands;
mod console;
mod logging;

use anyhow::Context;
use clap::Parser;
use warden_core::config::load_config;

use args::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;
    logging::init(&config.logging, cli.verbose);

    match cli.command {
        Commands::Run(args) => commands::run::execute(&config, args).await,
        Commands::Intent {
            name,
            params,
            tenant,
            session,
        } => commands::intent::execute(&config, &name, &params, tenant, session, cli.verbose).await,
        Commands::Session { command, params } => {
            commands::session::execute(&config, &command, &params).await
        }
        Commands::Policy { action } => commands::policy::execute(&config, action),
        Commands::Report { date, governance } => {
            commands::report::execute(&config, date.as_deref(), governance)
        }
        Commands::Capabilities { action } => commands::capabilities::execute(&config, action),
        Commands::Doctor => commands::doctor::execute(&cli.config, &config).await,
    }
}
