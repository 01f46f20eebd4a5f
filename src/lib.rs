//! # Duraheap - Memory-Mapped Durable Heap Sessions
//!
//! `duraheap` stores typed durable records in a persistent, memory-mapped
//! heap and opens typed SESSIONS over it for batch-processing tasks:
//!
//! - **Durable sessions**: read allocator parameters from a string-keyed
//!   configuration mapping, validate them, open the region, resolve a slot
//! - **Slot handles**: stable, keyed root references into the region
//! - **Service registry**: allocator backends selected by name, with a
//!   built-in file-backed `nonvolatile` heap
//! - **Scoped resources**: the mapped region is released whenever the
//!   owning session goes away, on every exit path
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use duraheap::{ConfigMap, InputSession, DEFAULT_INPUT_CONFIG_PREFIX, Result};
//!
//! # fn main() -> Result<()> {
//! let conf = ConfigMap::from_iter([
//!     ("duraheap.input.durable-types", "long"),
//!     ("duraheap.input.slot-key-id", "3"),
//! ]);
//!
//! let mut session = InputSession::from_config(conf);
//! session.read_config(DEFAULT_INPUT_CONFIG_PREFIX)?;
//! session.initialize("/data/records.heap")?;
//!
//! // Hand the resolved handle to a record reader
//! let handle = session.handle()?;
//! println!("slot {} at offset {}", handle.key_id(), handle.value());
//! # Ok(())
//! # }
//! ```

pub mod alloc;
pub mod config;
pub mod durable;
pub mod error;
pub mod header;
pub mod region;
pub mod service;
pub mod session;
pub mod slot;

// Re-export commonly used types
pub use alloc::{DurableAllocator, NonVolatileHeap};
pub use config::{ConfigMap, DEFAULT_INPUT_CONFIG_PREFIX, DEFAULT_SLOT_KEY_ID};
pub use durable::{
    instantiate_entity_factory_proxies, register_entity_factory_proxy, DurableType,
    EntityFactoryProxy,
};
pub use error::{HeapError, Result};
pub use header::{Header, PAGE_SIZE};
pub use region::HeapRegion;
pub use service::{
    lookup_service, open_allocator, register_service, AllocatorService, NONVOLATILE_SERVICE,
};
pub use session::{InputSession, SessionState, TaskAttemptContext, DEFAULT_CAPACITY};
pub use slot::{SlotHandle, SlotTable};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Region format magic number
pub const MAGIC: &[u8; 8] = &header::MAGIC;
