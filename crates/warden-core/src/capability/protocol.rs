//! Handshake and load negotiation between an agent and the registry

use serde::Serialize;
use std::sync::Arc;

use super::registry::{CapabilityRegistry, Manifest};

pub const PROTOCOL_VERSION: &str = "warden-capabilities/v1";

/// Requests estimated below this load in full
pub const LOAD_ALL_BELOW: usize = 1000;
/// Requests estimated below this load progressively; above, the agent must confirm
pub const PROGRESSIVE_BELOW: usize = 5000;
/// Capabilities loaded up front under the progressive strategy
pub const PROGRESSIVE_INITIAL: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStrategy {
    LoadAll,
    Progressive,
    ConfirmRequired,
}

#[derive(Debug, Clone, Serialize)]
pub struct Handshake {
    pub protocol: &'static str,
    pub manifest: Manifest,
    pub commands: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Negotiation {
    pub strategy: LoadStrategy,
    pub estimated_tokens: usize,
    pub initial_load: Vec<String>,
    pub deferred: Vec<String>,
}

pub struct CapabilityProtocol {
    registry: Arc<CapabilityRegistry>,
}

impl CapabilityProtocol {
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self { registry }
    }

    /// The only thing an agent receives before asking for more
    pub fn handshake(&self) -> Handshake {
        Handshake {
            protocol: PROTOCOL_VERSION,
            manifest: self.registry.get_manifest().clone(),
            commands: vec![
                "discover(capability_id) - load one capability",
                "search(query) - find capability ids",
                "estimate(capability_ids) - token cost of loading several",
            ],
        }
    }

    /// Decide how much of `needs` to load now, in request order
    pub fn negotiate(&self, needs: &[String]) -> Negotiation {
        let estimated_tokens = self.registry.estimate_total_load(needs);
        let (strategy, initial_load): (_, Vec<String>) = if estimated_tokens < LOAD_ALL_BELOW {
            (LoadStrategy::LoadAll, needs.to_vec())
        } else if estimated_tokens < PROGRESSIVE_BELOW {
            (
                LoadStrategy::Progressive,
                needs.iter().take(PROGRESSIVE_INITIAL).cloned().collect(),
            )
        } else {
            (LoadStrategy::ConfirmRequired, Vec::new())
        };

        let deferred = needs
            .iter()
            .filter(|need| !initial_load.contains(need))
            .cloned()
            .collect();

        Negotiation {
            strategy,
            estimated_tokens,
            initial_load,
            deferred,
        }
    }
}
