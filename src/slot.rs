//! Slot table and resolved slot handles
//!
//! Slots are the keyed root references of a region: an integer key id maps
//! to the offset of the record chain stored under it. The table lives in a
//! fixed page and is serialized as JSON, terminated by the first null byte.

use crate::error::{HeapError, Result};
use crate::header::PAGE_SIZE;
use crate::region::HeapRegion;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persisted slot-key → record-offset table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotTable {
    slots: BTreeMap<u64, u64>,
}

impl SlotTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key_id: u64) -> Option<u64> {
        self.slots.get(&key_id).copied()
    }

    pub fn set(&mut self, key_id: u64, value: u64) {
        self.slots.insert(key_id, value);
    }

    pub fn remove(&mut self, key_id: u64) -> Option<u64> {
        self.slots.remove(&key_id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Load the table from its region page
    pub fn load(region: &HeapRegion) -> Result<Self> {
        let page = region.read_page(region.header().slot_table_page)?;

        // JSON payload ends at the first null byte (fresh pages are zeroed)
        let end = page.iter().position(|&b| b == 0).unwrap_or(PAGE_SIZE);
        if end == 0 {
            return Ok(SlotTable::new());
        }

        let table: SlotTable = serde_json::from_slice(&page[..end])?;
        Ok(table)
    }

    /// Serialize the table back into its region page.
    ///
    /// Fails when the serialized table no longer fits its page; a truncated
    /// table would persist a region that can never be re-opened
    pub fn store(&self, region: &mut HeapRegion) -> Result<()> {
        let data = serde_json::to_vec(self)?;
        if data.len() > PAGE_SIZE {
            return Err(HeapError::OutOfSpace {
                requested: data.len() as u64,
                available: PAGE_SIZE as u64,
            });
        }

        let mut page = vec![0u8; PAGE_SIZE];
        page[..data.len()].copy_from_slice(&data);
        let page_id = region.header().slot_table_page;
        region.write_page(page_id, &page)
    }
}

/// A resolved reference into a persistent region.
///
/// Opaque beyond being handed to record-reading collaborators; only valid
/// while the allocator that produced it stays open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotHandle {
    key_id: u64,
    value: u64,
}

impl SlotHandle {
    pub(crate) fn new(key_id: u64, value: u64) -> Self {
        SlotHandle { key_id, value }
    }

    /// The slot key this handle was resolved from
    pub fn key_id(&self) -> u64 {
        self.key_id
    }

    /// Offset of the record chain rooted at this slot
    pub fn value(&self) -> u64 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_table_on_fresh_region() {
        let temp = NamedTempFile::new().unwrap();
        let region = HeapRegion::create(temp.path(), 64 * 1024).unwrap();

        let table = SlotTable::load(&region).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_store_rejects_oversized_table() {
        let temp = NamedTempFile::new().unwrap();
        let mut region = HeapRegion::create(temp.path(), 64 * 1024).unwrap();

        // Enough entries to push the JSON past one page
        let mut table = SlotTable::new();
        for key in 0..400u64 {
            table.set(100_000 + key, 131_072 + key);
        }

        assert!(matches!(
            table.store(&mut region),
            Err(HeapError::OutOfSpace { .. })
        ));

        // The page was left untouched and still loads as empty
        let loaded = SlotTable::load(&region).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_store_and_reload() {
        let temp = NamedTempFile::new().unwrap();
        let path = temp.path().to_path_buf();

        {
            let mut region = HeapRegion::create(&path, 64 * 1024).unwrap();
            let mut table = SlotTable::new();
            table.set(3, 8192);
            table.set(7, 12_288);
            table.store(&mut region).unwrap();
            region.flush().unwrap();
        }

        let region = HeapRegion::open(&path).unwrap();
        let table = SlotTable::load(&region).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(3), Some(8192));
        assert_eq!(table.get(7), Some(12_288));
        assert_eq!(table.get(99), None);
    }
}
