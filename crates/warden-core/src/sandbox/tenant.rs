//! Per-tenant isolated context maps

use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::info;

/// Context maps keyed by tenant id
///
/// Each tenant sees only its own map; clearing one never touches another.
#[derive(Debug, Default)]
pub struct TenantContexts {
    contexts: RwLock<HashMap<String, Map<String, Value>>>,
}

impl TenantContexts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the tenant's context, created empty on first access
    pub fn get(&self, tenant_id: &str) -> Map<String, Value> {
        if let Some(context) = self.contexts.read().get(tenant_id) {
            return context.clone();
        }
        self.contexts
            .write()
            .entry(tenant_id.to_string())
            .or_default()
            .clone()
    }

    pub fn set_value(&self, tenant_id: &str, key: impl Into<String>, value: Value) {
        self.contexts
            .write()
            .entry(tenant_id.to_string())
            .or_default()
            .insert(key.into(), value);
    }

    /// Drop the tenant's context; returns whether one existed
    pub fn clear(&self, tenant_id: &str) -> bool {
        let removed = self.contexts.write().remove(tenant_id).is_some();
        if removed {
            info!(tenant_id, "Tenant context cleared");
        }
        removed
    }

    pub fn tenant_count(&self) -> usize {
        self.contexts.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_created_on_demand() {
        let tenants = TenantContexts::new();
        assert!(tenants.get("a").is_empty());
        assert_eq!(tenants.tenant_count(), 1);
    }

    #[test]
    fn test_tenants_are_isolated() {
        let tenants = TenantContexts::new();
        tenants.set_value("a", "k", json!(1));
        tenants.set_value("b", "k", json!(2));

        assert_eq!(tenants.get("a")["k"], json!(1));
        assert!(tenants.clear("a"));
        assert!(!tenants.clear("a"));
        assert!(tenants.get("a").is_empty());
        assert_eq!(tenants.get("b")["k"], json!(2));
    }
}
