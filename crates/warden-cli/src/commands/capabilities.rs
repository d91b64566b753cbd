//! `warden capabilities`

use std::sync::Arc;
use warden_core::WardenConfig;
use warden_core::capability::{CapabilityProtocol, CapabilityRegistry};

use crate::args::CapabilityAction;
use crate::console::CliConsole;

pub fn execute(config: &WardenConfig, action: Option<CapabilityAction>) -> anyhow::Result<()> {
    let registry = Arc::new(CapabilityRegistry::from_config(&config.capabilities)?);
    let value = respond(registry, action.unwrap_or(CapabilityAction::Handshake))?;
    CliConsole::new(false).json(&value);
    Ok(())
}

fn respond(
    registry: Arc<CapabilityRegistry>,
    action: CapabilityAction,
) -> anyhow::Result<serde_json::Value> {
    let value = match action {
        CapabilityAction::Handshake => {
            serde_json::to_value(CapabilityProtocol::new(registry).handshake())?
        }
        CapabilityAction::Discover { id } => serde_json::to_value(&*registry.discover(&id)?)?,
        CapabilityAction::Search { query } => serde_json::to_value(registry.search(&query))?,
        CapabilityAction::Negotiate { ids } => {
            serde_json::to_value(CapabilityProtocol::new(registry).negotiate(&ids))?
        }
        CapabilityAction::Stats => serde_json::to_value(registry.stats())?,
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Arc<CapabilityRegistry> {
        Arc::new(CapabilityRegistry::with_builtins(b"cli-secret".to_vec()).unwrap())
    }

    #[test]
    fn test_negotiate_output() {
        let value = respond(
            registry(),
            CapabilityAction::Negotiate {
                ids: vec!["sentry".into()],
            },
        )
        .unwrap();
        assert_eq!(value["strategy"], "load_all");
        assert_eq!(value["initial_load"], serde_json::json!(["sentry"]));
    }

    #[test]
    fn test_unknown_capability_is_an_error() {
        let err = respond(registry(), CapabilityAction::Discover { id: "nope".into() }).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_handshake_is_default() {
        let value = respond(registry(), CapabilityAction::Handshake).unwrap();
        assert_eq!(value["protocol"], warden_core::capability::PROTOCOL_VERSION);
        assert!(value["manifest"]["manifest"]["caps"].is_array());
    }
}
