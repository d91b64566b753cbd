//! Signed capability registry with a compact manifest and lazy discovery

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::descriptor::{Capability, CapabilityDetails, builtin_capabilities};
use super::{CapabilityConfig, CapabilityError};

pub const MANIFEST_VERSION: u32 = 1;
const MANIFEST_HELP: &str = "Call discover(capability_id) to load a capability";

/// One manifest line: id, name, desc, cost and primary tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(rename = "i")]
    pub id: String,
    #[serde(rename = "n")]
    pub name: String,
    #[serde(rename = "d")]
    pub desc: String,
    #[serde(rename = "c")]
    pub cost: u32,
    #[serde(rename = "t")]
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactManifest {
    #[serde(rename = "v")]
    pub version: u32,
    #[serde(rename = "caps")]
    pub capabilities: Vec<ManifestEntry>,
}

/// What an agent loads first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub manifest: CompactManifest,
    /// Token estimate of the compact manifest
    pub tokens: usize,
    pub help: String,
}

/// Tools an intent resolves to, and what loading them costs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolRoute {
    pub capability: String,
    pub tools: Vec<String>,
    pub estimated_tokens: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityStats {
    pub total_capabilities: usize,
    pub manifest_tokens: usize,
    pub loaded_capabilities: Vec<String>,
    pub cache_size: usize,
    pub total_tokens_if_all_loaded: u64,
}

/// Holds only descriptors whose signature verified on registration
///
/// Details handed out by [`discover`](Self::discover) are cached for the
/// registry's lifetime.
#[derive(Debug)]
pub struct CapabilityRegistry {
    secret: Vec<u8>,
    capabilities: BTreeMap<String, Capability>,
    /// Intent name to owning capability id
    intents: BTreeMap<String, String>,
    manifest: Manifest,
    loaded: Mutex<BTreeMap<String, Arc<CapabilityDetails>>>,
}

impl CapabilityRegistry {
    /// Empty registry verifying against `secret`
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        let mut registry = Self {
            secret: secret.into(),
            capabilities: BTreeMap::new(),
            intents: BTreeMap::new(),
            manifest: Manifest {
                manifest: CompactManifest {
                    version: MANIFEST_VERSION,
                    capabilities: Vec::new(),
                },
                tokens: 0,
                help: MANIFEST_HELP.to_string(),
            },
            loaded: Mutex::new(BTreeMap::new()),
        };
        registry.rebuild_manifest();
        registry
    }

    /// Registry holding the built-in capabilities, signed with `secret`
    pub fn with_builtins(secret: impl Into<Vec<u8>>) -> Result<Self, CapabilityError> {
        let mut registry = Self::new(secret);
        for mut capability in builtin_capabilities() {
            capability.descriptor.sign(&registry.secret)?;
            registry.register(capability)?;
        }
        Ok(registry)
    }

    /// Built-ins plus the configured manifest file
    ///
    /// Without a configured secret the built-ins are signed with a random
    /// per-process key, and a manifest file cannot be verified.
    pub fn from_config(config: &CapabilityConfig) -> Result<Self, CapabilityError> {
        let secret = match &config.signing_secret {
            Some(secret) => secret.clone(),
            None => {
                if let Some(path) = &config.manifest {
                    return Err(CapabilityError::MissingSecret { path: path.clone() });
                }
                debug!("No capability secret configured, using an ephemeral key");
                uuid::Uuid::new_v4().to_string()
            }
        };

        let mut registry = Self::with_builtins(secret)?;
        if let Some(path) = &config.manifest {
            registry.load_manifest(path)?;
        }
        Ok(registry)
    }

    /// Add a signed capability, replacing any with the same id
    pub fn register(&mut self, capability: Capability) -> Result<(), CapabilityError> {
        let descriptor = &capability.descriptor;
        descriptor.validate()?;
        if !descriptor.verify(&self.secret) {
            return Err(CapabilityError::InvalidSignature(descriptor.id.clone()));
        }
        for intent in capability.details.routes.keys() {
            match self.intents.get(intent) {
                Some(owner) if owner != capability.id() => {
                    return Err(CapabilityError::RouteConflict {
                        intent: intent.clone(),
                        owner: owner.clone(),
                    });
                }
                _ => {}
            }
        }

        let id = capability.id().to_string();
        if self.capabilities.remove(&id).is_some() {
            info!(capability = %id, "Replacing capability");
            self.intents.retain(|_, owner| *owner != id);
        }
        for intent in capability.details.routes.keys() {
            self.intents.insert(intent.clone(), id.clone());
        }
        self.capabilities.insert(id.clone(), capability);
        self.loaded.lock().remove(&id);
        self.rebuild_manifest();
        Ok(())
    }

    /// Register every capability in a JSON array file; each must be signed
    pub fn load_manifest(&mut self, path: &Path) -> Result<usize, CapabilityError> {
        let content = std::fs::read_to_string(path).map_err(|e| CapabilityError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let capabilities: Vec<Capability> =
            serde_json::from_str(&content).map_err(|e| CapabilityError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let count = capabilities.len();
        for capability in capabilities {
            self.register(capability)?;
        }
        info!(path = %path.display(), count, "Loaded capability manifest");
        Ok(count)
    }

    fn rebuild_manifest(&mut self) {
        let compact = CompactManifest {
            version: MANIFEST_VERSION,
            capabilities: self
                .capabilities
                .values()
                .map(|capability| {
                    let descriptor = &capability.descriptor;
                    ManifestEntry {
                        id: descriptor.id.clone(),
                        name: descriptor.name.clone(),
                        desc: descriptor.desc.clone(),
                        cost: descriptor.cost,
                        tag: descriptor.tags.first().cloned().unwrap_or_default(),
                    }
                })
                .collect(),
        };
        let tokens = serde_json::to_string(&compact)
            .map(|json| json.len() / 4)
            .unwrap_or(0);
        debug!(capabilities = compact.capabilities.len(), tokens, "Manifest computed");
        self.manifest = Manifest {
            manifest: compact,
            tokens,
            help: MANIFEST_HELP.to_string(),
        };
    }

    pub fn get_manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn manifest_tokens(&self) -> usize {
        self.manifest.tokens
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Capability> {
        self.capabilities.get(id)
    }

    /// Full details for one capability, cached after the first call
    pub fn discover(&self, id: &str) -> Result<Arc<CapabilityDetails>, CapabilityError> {
        let Some(capability) = self.capabilities.get(id) else {
            warn!(capability = id, "Capability not found");
            return Err(CapabilityError::NotFound(id.to_string()));
        };

        let mut loaded = self.loaded.lock();
        if let Some(details) = loaded.get(id) {
            debug!(capability = id, "Capability cache hit");
            return Ok(details.clone());
        }
        if !capability.descriptor.verify(&self.secret) {
            return Err(CapabilityError::InvalidSignature(id.to_string()));
        }

        let details = Arc::new(capability.details.clone());
        loaded.insert(id.to_string(), details.clone());
        info!(capability = id, tokens_used = capability.descriptor.cost, "Capability loaded");
        Ok(details)
    }

    /// Ids whose name, description or tags contain `query`, case-insensitively
    pub fn search(&self, query: &str) -> Vec<String> {
        let query = query.to_lowercase();
        self.capabilities
            .values()
            .filter(|capability| {
                let d = &capability.descriptor;
                format!("{} {} {}", d.name, d.desc, d.tags.join(" "))
                    .to_lowercase()
                    .contains(&query)
            })
            .map(|capability| capability.id().to_string())
            .collect()
    }

    /// Manifest tokens plus the cost of each known id; unknown ids add nothing
    pub fn estimate_total_load<S: AsRef<str>>(&self, ids: &[S]) -> usize {
        ids.iter()
            .filter_map(|id| self.capabilities.get(id.as_ref()))
            .map(|capability| capability.descriptor.cost as usize)
            .sum::<usize>()
            + self.manifest.tokens
    }

    /// Tools serving `intent` and the cost of loading their capability
    pub fn route(&self, intent: &str) -> Option<ToolRoute> {
        let owner = self.intents.get(intent)?;
        let capability = self.capabilities.get(owner)?;
        Some(ToolRoute {
            capability: owner.clone(),
            tools: capability.details.routes.get(intent).cloned().unwrap_or_default(),
            estimated_tokens: self.estimate_total_load(&[owner]),
        })
    }

    pub fn stats(&self) -> CapabilityStats {
        let loaded = self.loaded.lock();
        CapabilityStats {
            total_capabilities: self.capabilities.len(),
            manifest_tokens: self.manifest.tokens,
            loaded_capabilities: loaded.keys().cloned().collect(),
            cache_size: loaded.len(),
            total_tokens_if_all_loaded: self
                .capabilities
                .values()
                .map(|capability| u64::from(capability.descriptor.cost))
                .sum(),
        }
    }
}
