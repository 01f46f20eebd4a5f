use crate::error::{HeapError, Result};

pub const MAGIC: [u8; 8] = *b"DURA\x00\x01\x00\x00";
pub const VERSION_MAJOR: u16 = 1;
pub const VERSION_MINOR: u16 = 0;
pub const PAGE_SIZE: usize = 4096;

/// Byte count of the fixed header fields covered by the checksum.
const FIXED_LEN: usize = 8 + 2 + 2 + 4 + 8 + 8 + 8;

/// Heap region header (Page 0)
///
/// The header occupies the first 4KB page of the mapped region and carries
/// the metadata needed to re-open it: version info, capacity, the bump
/// allocation tail, and the page holding the slot table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Magic number: "DURA\x00\x01\x00\x00"
    pub magic: [u8; 8],

    /// Format version (major)
    pub version_major: u16,

    /// Format version (minor)
    pub version_minor: u16,

    /// Block size in bytes (always 4096)
    pub block_size: u32,

    /// Total region capacity in bytes
    pub capacity: u64,

    /// First unallocated byte offset (bump pointer); never below the data area
    pub data_tail: u64,

    /// Page ID of the slot table
    pub slot_table_page: u64,

    /// CRC32 over the fixed fields above
    pub checksum: u32,
}

impl Header {
    /// Create a new header for a region of the given capacity.
    ///
    /// Pages 0 and 1 are reserved for the header and the slot table; the
    /// data area starts right after them.
    pub fn new(capacity: u64) -> Self {
        let mut header = Header {
            magic: MAGIC,
            version_major: VERSION_MAJOR,
            version_minor: VERSION_MINOR,
            block_size: PAGE_SIZE as u32,
            capacity,
            data_tail: 2 * PAGE_SIZE as u64,
            slot_table_page: 1,
            checksum: 0,
        };
        header.checksum = header.compute_checksum();
        header
    }

    fn fixed_bytes(&self) -> [u8; FIXED_LEN] {
        let mut bytes = [0u8; FIXED_LEN];
        let mut offset = 0;
        bytes[offset..offset + 8].copy_from_slice(&self.magic);
        offset += 8;
        bytes[offset..offset + 2].copy_from_slice(&self.version_major.to_le_bytes());
        offset += 2;
        bytes[offset..offset + 2].copy_from_slice(&self.version_minor.to_le_bytes());
        offset += 2;
        bytes[offset..offset + 4].copy_from_slice(&self.block_size.to_le_bytes());
        offset += 4;
        bytes[offset..offset + 8].copy_from_slice(&self.capacity.to_le_bytes());
        offset += 8;
        bytes[offset..offset + 8].copy_from_slice(&self.data_tail.to_le_bytes());
        offset += 8;
        bytes[offset..offset + 8].copy_from_slice(&self.slot_table_page.to_le_bytes());
        bytes
    }

    /// Compute the CRC32 over the fixed header fields
    pub fn compute_checksum(&self) -> u32 {
        crc32fast::hash(&self.fixed_bytes())
    }

    /// Validate magic, version, block size, checksum, and field sanity
    pub fn validate(&self) -> Result<()> {
        if self.magic != MAGIC {
            return Err(HeapError::InvalidMagic);
        }

        // Exact version match for now
        if self.version_major != VERSION_MAJOR || self.version_minor != VERSION_MINOR {
            return Err(HeapError::UnsupportedVersion {
                major: self.version_major,
                minor: self.version_minor,
            });
        }

        if self.block_size != PAGE_SIZE as u32 {
            return Err(HeapError::InvalidBlockSize(self.block_size));
        }

        if self.checksum != self.compute_checksum() {
            return Err(HeapError::ChecksumMismatch);
        }

        // Sanity: the bump pointer stays inside the region, past the
        // reserved pages
        if self.data_tail < 2 * PAGE_SIZE as u64 || self.data_tail > self.capacity {
            return Err(HeapError::OutOfSpace {
                requested: self.data_tail,
                available: self.capacity,
            });
        }

        // Sanity: the slot table page lies inside the region
        if self.slot_table_page >= self.capacity / PAGE_SIZE as u64 {
            return Err(HeapError::OutOfSpace {
                requested: self.slot_table_page,
                available: self.capacity / PAGE_SIZE as u64,
            });
        }

        Ok(())
    }

    /// Serialize the header into a full page
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(PAGE_SIZE);
        bytes.extend_from_slice(&self.fixed_bytes());
        bytes.extend_from_slice(&self.checksum.to_le_bytes());
        bytes.resize(PAGE_SIZE, 0);
        bytes
    }

    /// Deserialize and validate a header from a page-0 buffer
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < FIXED_LEN + 4 {
            return Err(HeapError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "Insufficient bytes for region header",
            )));
        }

        let mut header = Header::new(0);
        let mut offset = 0;

        header.magic.copy_from_slice(&bytes[offset..offset + 8]);
        offset += 8;

        header.version_major = u16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
        offset += 2;

        header.version_minor = u16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
        offset += 2;

        header.block_size = u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ]);
        offset += 4;

        header.capacity = u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap());
        offset += 8;

        header.data_tail = u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap());
        offset += 8;

        header.slot_table_page = u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap());
        offset += 8;

        header.checksum = u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ]);

        header.validate()?;

        Ok(header)
    }
}
