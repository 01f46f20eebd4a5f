//! Read-only configuration mapping and namespaced key helpers
//!
//! Sessions read four values under a namespacing prefix: the allocator
//! service name, the durable-type list, the entity-factory-proxy list, and
//! the slot key id. How those values got into the mapping (job submission,
//! config files) belongs to the surrounding framework; only the value
//! formats are owned here.

use crate::durable::{parse_durable_types, DurableType};
use crate::error::{HeapError, Result};
use crate::service::NONVOLATILE_SERVICE;
use std::collections::HashMap;

/// Default namespacing prefix for input-session keys
pub const DEFAULT_INPUT_CONFIG_PREFIX: &str = "duraheap.input.";

/// Key suffix: allocator service name
pub const MEM_SERVICE_NAME: &str = "mem-service-name";
/// Key suffix: comma-separated durable-type tags
pub const DURABLE_TYPES: &str = "durable-types";
/// Key suffix: comma-separated entity-factory-proxy descriptors
pub const ENTITY_FACTORY_PROXIES: &str = "entity-factory-proxies";
/// Key suffix: integer slot key id
pub const SLOT_KEY_ID: &str = "slot-key-id";

/// Default slot key id when the key is absent
pub const DEFAULT_SLOT_KEY_ID: u64 = 0;

/// An externally owned, string-keyed configuration mapping.
///
/// Sessions only read from it; there is no mutation surface.
#[derive(Debug, Clone, Default)]
pub struct ConfigMap {
    entries: HashMap<String, String>,
}

impl ConfigMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    fn get_prefixed(&self, prefix: &str, suffix: &str) -> Option<&str> {
        self.entries
            .get(&format!("{}{}", prefix, suffix))
            .map(String::as_str)
    }

    /// Allocator service name; defaults to the built-in service
    pub fn mem_service_name(&self, prefix: &str) -> String {
        self.get_prefixed(prefix, MEM_SERVICE_NAME)
            .unwrap_or(NONVOLATILE_SERVICE)
            .to_string()
    }

    /// Ordered durable-type tags; an absent key yields an empty list,
    /// which validation then rejects
    pub fn durable_types(&self, prefix: &str) -> Result<Vec<DurableType>> {
        match self.get_prefixed(prefix, DURABLE_TYPES) {
            Some(encoded) => parse_durable_types(encoded),
            None => Ok(Vec::new()),
        }
    }

    /// Ordered entity-factory-proxy descriptors; may legitimately be empty
    pub fn entity_factory_proxies(&self, prefix: &str) -> Vec<String> {
        self.get_prefixed(prefix, ENTITY_FACTORY_PROXIES)
            .map(|encoded| {
                encoded
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Slot key id; defaults to [`DEFAULT_SLOT_KEY_ID`]
    pub fn slot_key_id(&self, prefix: &str) -> Result<u64> {
        match self.get_prefixed(prefix, SLOT_KEY_ID) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                HeapError::InvalidConfigValue {
                    key: format!("{}{}", prefix, SLOT_KEY_ID),
                    value: raw.to_string(),
                }
            }),
            None => Ok(DEFAULT_SLOT_KEY_ID),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        ConfigMap {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<HashMap<String, String>> for ConfigMap {
    fn from(entries: HashMap<String, String>) -> Self {
        ConfigMap { entries }
    }
}
