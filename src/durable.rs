//! Durable type tags and entity factory proxies

use crate::error::{HeapError, Result};
use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Tag describing the shape of one stored record field.
///
/// Primitive scalars are self-describing; `Durable` marks a nested durable
/// entity that needs an [`EntityFactoryProxy`] to be reconstructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurableType {
    Boolean,
    Character,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    String,
    Buffer,
    Chunk,
    Durable,
}

impl DurableType {
    /// True for tags that require an entity factory proxy to reconstruct
    pub fn is_durable(&self) -> bool {
        matches!(self, DurableType::Durable)
    }
}

impl FromStr for DurableType {
    type Err = HeapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "boolean" => Ok(DurableType::Boolean),
            "character" => Ok(DurableType::Character),
            "byte" => Ok(DurableType::Byte),
            "short" => Ok(DurableType::Short),
            "integer" => Ok(DurableType::Integer),
            "long" => Ok(DurableType::Long),
            "float" => Ok(DurableType::Float),
            "double" => Ok(DurableType::Double),
            "string" => Ok(DurableType::String),
            "buffer" => Ok(DurableType::Buffer),
            "chunk" => Ok(DurableType::Chunk),
            "durable" => Ok(DurableType::Durable),
            other => Err(HeapError::InvalidDurableType(other.to_string())),
        }
    }
}

impl fmt::Display for DurableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            DurableType::Boolean => "boolean",
            DurableType::Character => "character",
            DurableType::Byte => "byte",
            DurableType::Short => "short",
            DurableType::Integer => "integer",
            DurableType::Long => "long",
            DurableType::Float => "float",
            DurableType::Double => "double",
            DurableType::String => "string",
            DurableType::Buffer => "buffer",
            DurableType::Chunk => "chunk",
            DurableType::Durable => "durable",
        };
        f.write_str(tag)
    }
}

/// Parse a comma-separated durable-type list as stored in configuration
pub fn parse_durable_types(encoded: &str) -> Result<Vec<DurableType>> {
    encoded
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(DurableType::from_str)
        .collect()
}

/// Descriptor object capable of reconstructing a nested durable entity
/// from raw region memory.
///
/// Reconstruction itself happens in downstream record readers; at the
/// session layer a proxy is an opaque capability identified by the entity
/// kind it restores.
pub trait EntityFactoryProxy: Send + Sync {
    /// Entity kind this proxy restores, matching its config descriptor
    fn entity_kind(&self) -> &str;
}

lazy_static! {
    static ref PROXY_REGISTRY: RwLock<HashMap<String, Arc<dyn EntityFactoryProxy>>> =
        RwLock::new(HashMap::new());
}

/// Register a proxy under its entity kind, replacing any previous one
pub fn register_entity_factory_proxy(proxy: Arc<dyn EntityFactoryProxy>) {
    PROXY_REGISTRY
        .write()
        .insert(proxy.entity_kind().to_string(), proxy);
}

/// Instantiate one proxy per descriptor, in order.
///
/// An unregistered descriptor is a configuration error: without its proxy
/// the corresponding entity could never be reconstructed.
pub fn instantiate_entity_factory_proxies(
    descriptors: &[String],
) -> Result<Vec<Arc<dyn EntityFactoryProxy>>> {
    let registry = PROXY_REGISTRY.read();
    descriptors
        .iter()
        .map(|d| {
            registry
                .get(d.trim())
                .cloned()
                .ok_or_else(|| HeapError::UnknownEntityFactoryProxy(d.trim().to_string()))
        })
        .collect()
}
