//! CLI argument definitions using clap
//!
//! - warden run --code "print(1)"      # Execute code through the orchestrator
//! - warden intent list_errors          # Route an intent
//! - warden session create              # Session protocol command
//! - warden policy show|verify|sign     # Policy inspection and signing
//! - warden capabilities negotiate a b  # Capability registry queries
//! - warden report [--governance]      # Compliance or governance report
//! - warden doctor                      # Health check

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "warden.toml";

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Warden - policy-checked, audited sandboxed code execution")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (TOML, YAML or JSON)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE, env = "WARDEN_CONFIG")]
    pub config: PathBuf,

    /// Enable debug logging and extra output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute code in the strongest available sandbox and print the result as JSON
    Run(RunArgs),

    /// Route a named intent through the configured execution mode
    Intent {
        /// Intent name, e.g. list_errors
        name: String,

        /// Intent parameters as a JSON object
        #[arg(long, default_value = "{}")]
        params: String,

        /// Tenant the request is attributed to
        #[arg(long)]
        tenant: Option<String>,

        /// Session the request is attributed to
        #[arg(long)]
        session: Option<String>,
    },

    /// Run a session protocol command against an in-process session manager
    Session {
        /// One of create, reset, extend, list, snapshot, restore, stats
        command: String,

        /// Command parameters as a JSON object
        #[arg(long, default_value = "{}")]
        params: String,
    },

    /// Inspect, verify and sign execution policies
    Policy {
        #[command(subcommand)]
        action: PolicyAction,
    },

    /// Compliance report built from one day of audit records
    Report {
        /// Day to report on (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,

        /// Governance summary: usage distributions by mode plus the compliance report
        #[arg(long)]
        governance: bool,
    },

    /// Query the capability registry
    Capabilities {
        #[command(subcommand)]
        action: Option<CapabilityAction>,
    },

    /// Check backend availability, policy status and directories
    Doctor,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct CodeSource {
    /// Code to execute
    #[arg(long)]
    pub code: Option<String>,

    /// File holding the code to execute
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: CodeSource,

    /// Tenant the execution is attributed to
    #[arg(long)]
    pub tenant: Option<String>,

    /// Session the execution is attributed to
    #[arg(long)]
    pub session: Option<String>,
}

#[derive(Subcommand, Clone)]
pub enum PolicyAction {
    /// Print the active policy
    Show,

    /// Load the policy and check its signature against the trusted key
    Verify,

    /// Sign the policy file in place
    Sign {
        /// File holding a base64 Ed25519 secret seed
        #[arg(long)]
        key: PathBuf,
    },

    /// Print the SHA-256 digest of the policy's canonical form
    Digest,
}

#[derive(Subcommand, Clone)]
pub enum CapabilityAction {
    /// Print the protocol handshake with the compact manifest (default)
    Handshake,

    /// Load the full details of one capability
    Discover { id: String },

    /// List capability ids matching a keyword
    Search { query: String },

    /// Plan how to load the given capabilities
    Negotiate {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Registry size and token totals
    Stats,
}
