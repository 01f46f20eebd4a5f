//! Allocator service registry
//!
//! Backends are looked up by service name at session initialization. The
//! registry is process-wide and comes pre-seeded with the built-in
//! `"nonvolatile"` service; embedders can register additional backends at
//! process start.

use crate::alloc::{DurableAllocator, NonVolatileHeap};
use crate::error::{HeapError, Result};
use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Name of the built-in file-backed service
pub const NONVOLATILE_SERVICE: &str = "nonvolatile";

/// Factory for a durable allocator backend
pub trait AllocatorService: Send + Sync {
    fn name(&self) -> &str;

    /// Open an allocator against `path`.
    ///
    /// `capacity` is the initial sizing request; `activate_existing`
    /// selects re-open semantics over fresh formatting.
    fn open(
        &self,
        path: &Path,
        capacity: u64,
        activate_existing: bool,
    ) -> Result<Box<dyn DurableAllocator>>;
}

struct NonVolatileService;

impl AllocatorService for NonVolatileService {
    fn name(&self) -> &str {
        NONVOLATILE_SERVICE
    }

    fn open(
        &self,
        path: &Path,
        capacity: u64,
        activate_existing: bool,
    ) -> Result<Box<dyn DurableAllocator>> {
        Ok(Box::new(NonVolatileHeap::open(
            path,
            capacity,
            activate_existing,
        )?))
    }
}

lazy_static! {
    static ref REGISTRY: RwLock<HashMap<String, Arc<dyn AllocatorService>>> = {
        let mut services: HashMap<String, Arc<dyn AllocatorService>> = HashMap::new();
        services.insert(
            NONVOLATILE_SERVICE.to_string(),
            Arc::new(NonVolatileService),
        );
        RwLock::new(services)
    };
}

/// Register an allocator service under its own name, replacing any previous
/// registration.
pub fn register_service(service: Arc<dyn AllocatorService>) {
    let name = service.name().to_string();
    tracing::debug!(%name, "registering allocator service");
    REGISTRY.write().insert(name, service);
}

/// Look up a registered service by name
pub fn lookup_service(name: &str) -> Result<Arc<dyn AllocatorService>> {
    REGISTRY
        .read()
        .get(name)
        .cloned()
        .ok_or_else(|| HeapError::UnknownService(name.to_string()))
}

/// Resolve `name` and open an allocator through it
pub fn open_allocator(
    name: &str,
    path: &Path,
    capacity: u64,
    activate_existing: bool,
) -> Result<Box<dyn DurableAllocator>> {
    lookup_service(name)?.open(path, capacity, activate_existing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_service_is_registered() {
        assert!(lookup_service(NONVOLATILE_SERVICE).is_ok());
    }

    #[test]
    fn test_unknown_service() {
        assert!(matches!(
            lookup_service("pmalloc"),
            Err(HeapError::UnknownService(name)) if name == "pmalloc"
        ));
    }

    #[test]
    fn test_open_through_registry() {
        let temp = NamedTempFile::new().unwrap();
        let alloc =
            open_allocator(NONVOLATILE_SERVICE, temp.path(), 64 * 1024, false).unwrap();
        assert_eq!(alloc.capacity(), 64 * 1024);
    }
}
