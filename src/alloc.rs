//! Durable allocator seam and the built-in non-volatile heap
//!
//! `DurableAllocator` is the capability a session needs from a persistent
//! region: resolve a slot into a handle, and (for region builders) allocate
//! space and register slots. Concrete backends are selected by service name
//! through the registry in [`crate::service`].

use crate::error::{HeapError, Result};
use crate::region::HeapRegion;
use crate::slot::{SlotHandle, SlotTable};
use std::path::Path;

/// Capability object for an open persistent region.
///
/// Sessions own exactly one of these for their lifetime; dropping it
/// releases the mapped region.
pub trait DurableAllocator: Send {
    /// Resolve the slot registered under `key_id` into a stable handle
    fn handler(&self, key_id: u64) -> Result<SlotHandle>;

    /// Register (or overwrite) the slot under `key_id`
    fn set_handler(&mut self, key_id: u64, value: u64) -> Result<()>;

    /// Reserve `len` bytes from the data area, returning their offset
    fn allocate(&mut self, len: u64) -> Result<u64>;

    /// Flush region state to the backing file
    fn flush(&mut self) -> Result<()>;

    /// Region capacity in bytes
    fn capacity(&self) -> u64;
}

/// File-backed, memory-mapped allocator with bump allocation.
///
/// The write surface (`allocate`, `set_handler`) is the minimum needed to
/// build regions that input sessions then re-open; free-list management is
/// deliberately absent.
pub struct NonVolatileHeap {
    region: HeapRegion,
    slots: SlotTable,
}

impl NonVolatileHeap {
    /// Open a heap against `path`.
    ///
    /// `capacity` is an initial sizing request used when formatting a fresh
    /// region, a growth hint rather than a hard limit. With
    /// `activate_existing` set, the file must already hold a valid region
    /// and `capacity` is ignored in favor of the persisted one.
    pub fn open<P: AsRef<Path>>(path: P, capacity: u64, activate_existing: bool) -> Result<Self> {
        let region = if activate_existing {
            HeapRegion::open(&path)?
        } else {
            HeapRegion::create(&path, capacity)?
        };
        let slots = SlotTable::load(&region)?;
        Ok(NonVolatileHeap { region, slots })
    }

    pub fn region(&self) -> &HeapRegion {
        &self.region
    }

    /// Mutable region access for builders: write record bytes into offsets
    /// reserved through [`DurableAllocator::allocate`]
    pub fn region_mut(&mut self) -> &mut HeapRegion {
        &mut self.region
    }
}

impl DurableAllocator for NonVolatileHeap {
    fn handler(&self, key_id: u64) -> Result<SlotHandle> {
        match self.slots.get(key_id) {
            Some(value) => Ok(SlotHandle::new(key_id, value)),
            None => Err(HeapError::UnknownSlot(key_id)),
        }
    }

    fn set_handler(&mut self, key_id: u64, value: u64) -> Result<()> {
        let previous = self.slots.get(key_id);
        self.slots.set(key_id, value);

        // Roll the in-memory table back on a failed store so it keeps
        // matching what the page actually holds
        if let Err(err) = self.slots.store(&mut self.region) {
            match previous {
                Some(value) => self.slots.set(key_id, value),
                None => {
                    self.slots.remove(key_id);
                }
            }
            return Err(err);
        }
        Ok(())
    }

    fn allocate(&mut self, len: u64) -> Result<u64> {
        let mut header = *self.region.header();
        let offset = header.data_tail;

        // Keep allocations 8-byte aligned
        let padded = len.div_ceil(8) * 8;
        let new_tail = offset + padded;
        if new_tail > header.capacity {
            return Err(HeapError::OutOfSpace {
                requested: padded,
                available: header.capacity - header.data_tail,
            });
        }

        header.data_tail = new_tail;
        self.region.update_header(header);
        Ok(offset)
    }

    fn flush(&mut self) -> Result<()> {
        self.slots.store(&mut self.region)?;
        self.region.flush()
    }

    fn capacity(&self) -> u64 {
        self.region.capacity()
    }
}

impl Drop for NonVolatileHeap {
    fn drop(&mut self) {
        // Final flush on release; errors here have no caller to go to
        if let Err(err) = self.flush() {
            tracing::warn!(path = %self.region.path().display(), %err, "flush on close failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::PAGE_SIZE;
    use tempfile::NamedTempFile;

    #[test]
    fn test_fresh_heap_has_no_slots() {
        let temp = NamedTempFile::new().unwrap();
        let heap = NonVolatileHeap::open(temp.path(), 64 * 1024, false).unwrap();
        assert!(matches!(heap.handler(0), Err(HeapError::UnknownSlot(0))));
    }

    #[test]
    fn test_set_and_resolve_slot() {
        let temp = NamedTempFile::new().unwrap();
        let mut heap = NonVolatileHeap::open(temp.path(), 64 * 1024, false).unwrap();

        let offset = heap.allocate(100).unwrap();
        heap.set_handler(3, offset).unwrap();

        let handle = heap.handler(3).unwrap();
        assert_eq!(handle.key_id(), 3);
        assert_eq!(handle.value(), offset);
    }

    #[test]
    fn test_slots_survive_reopen() {
        let temp = NamedTempFile::new().unwrap();
        let path = temp.path().to_path_buf();

        let offset;
        {
            let mut heap = NonVolatileHeap::open(&path, 64 * 1024, false).unwrap();
            offset = heap.allocate(256).unwrap();
            heap.set_handler(3, offset).unwrap();
            heap.flush().unwrap();
        }

        let heap = NonVolatileHeap::open(&path, 64 * 1024, true).unwrap();
        assert_eq!(heap.handler(3).unwrap().value(), offset);
    }

    #[test]
    fn test_slot_table_overflow_fails_loudly() {
        let temp = NamedTempFile::new().unwrap();
        let path = temp.path().to_path_buf();

        let mut stored = Vec::new();
        {
            let mut heap = NonVolatileHeap::open(&path, 256 * 1024, false).unwrap();
            for key in 0..600u64 {
                let offset = heap.allocate(16).unwrap();
                match heap.set_handler(key, offset) {
                    Ok(()) => stored.push((key, offset)),
                    Err(HeapError::OutOfSpace { .. }) => break,
                    Err(err) => panic!("unexpected error: {err}"),
                }
            }
            // The page must fill up well before 600 entries
            assert!(stored.len() < 600);
            heap.flush().unwrap();
        }

        // Every registration acknowledged with Ok survives the reopen
        let heap = NonVolatileHeap::open(&path, 0, true).unwrap();
        for (key, offset) in stored {
            assert_eq!(heap.handler(key).unwrap().value(), offset);
        }
    }

    #[test]
    fn test_builder_writes_record_bytes() {
        let temp = NamedTempFile::new().unwrap();
        let path = temp.path().to_path_buf();

        {
            let mut heap = NonVolatileHeap::open(&path, 64 * 1024, false).unwrap();
            let offset = heap.allocate(32).unwrap();
            heap.region_mut().write_at(offset, b"record payload").unwrap();
            heap.set_handler(5, offset).unwrap();
            heap.flush().unwrap();
        }

        let heap = NonVolatileHeap::open(&path, 0, true).unwrap();
        let handle = heap.handler(5).unwrap();
        assert_eq!(
            heap.region().read_at(handle.value(), 14).unwrap(),
            b"record payload"
        );
    }

    #[test]
    fn test_activate_existing_requires_region() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), vec![0u8; 4 * PAGE_SIZE]).unwrap();
        assert!(NonVolatileHeap::open(temp.path(), 64 * 1024, true).is_err());
    }

    #[test]
    fn test_allocation_is_aligned_and_bounded() {
        let temp = NamedTempFile::new().unwrap();
        let mut heap = NonVolatileHeap::open(temp.path(), 16 * 1024, false).unwrap();

        let a = heap.allocate(5).unwrap();
        let b = heap.allocate(5).unwrap();
        assert_eq!(a % 8, 0);
        assert_eq!(b, a + 8);

        assert!(matches!(
            heap.allocate(1 << 20),
            Err(HeapError::OutOfSpace { .. })
        ));
    }
}
