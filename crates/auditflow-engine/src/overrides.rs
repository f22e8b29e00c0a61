use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde_json::{Map, Value};

use auditflow_core::provider::MappingOverrideStore;

/// Manual account-to-category overrides held in memory.
///
/// The orchestrator only reads this store; callers own the writes.
#[derive(Debug, Default)]
pub struct InMemoryMappingOverrides {
    overrides: RwLock<BTreeMap<String, String>>,
}

impl InMemoryMappingOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a JSON object of `account -> category` strings.
    ///
    /// Non-string values are skipped.
    pub fn from_json(map: &Map<String, Value>) -> Self {
        let overrides = map
            .iter()
            .filter_map(|(account, v)| v.as_str().map(|c| (account.clone(), c.to_string())))
            .collect();
        Self {
            overrides: RwLock::new(overrides),
        }
    }

    pub fn set(&self, account: impl Into<String>, category: impl Into<String>) {
        let _ = self.overrides.write().insert(account.into(), category.into());
    }

    pub fn remove(&self, account: &str) -> Option<String> {
        self.overrides.write().remove(account)
    }

    pub fn clear(&self) {
        self.overrides.write().clear();
    }

    pub fn len(&self) -> usize {
        self.overrides.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.read().is_empty()
    }
}

impl MappingOverrideStore for InMemoryMappingOverrides {
    fn overrides_for_api(&self) -> Map<String, Value> {
        self.overrides
            .read()
            .iter()
            .map(|(account, category)| (account.clone(), Value::String(category.clone())))
            .collect()
    }
}
