//! Memory-mapped backing file for a durable heap region

use crate::error::{HeapError, Result};
use crate::header::{Header, PAGE_SIZE};
use memmap2::MmapMut;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// A heap region mapped into the process address space.
///
/// The whole file is mapped at offset 0; page 0 is the header, page 1 the
/// slot table, everything after is the data area. The mapping is released
/// when the region is dropped, on every exit path.
pub struct HeapRegion {
    mmap: MmapMut,
    header: Header,
    path: PathBuf,
}

impl HeapRegion {
    /// Create a fresh region of the given capacity, formatting page 0.
    ///
    /// The capacity is rounded up to a whole number of pages and must leave
    /// room for the two reserved pages.
    pub fn create<P: AsRef<Path>>(path: P, capacity: u64) -> Result<Self> {
        let capacity = capacity.max(3 * PAGE_SIZE as u64);
        let capacity = capacity.div_ceil(PAGE_SIZE as u64) * PAGE_SIZE as u64;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        file.set_len(capacity)?;

        // SAFETY: the mapping stays valid after the file handle drops; the
        // caller must not truncate the backing file while mapped.
        let mut mmap = unsafe { MmapMut::map_mut(&file)? };

        let header = Header::new(capacity);
        mmap[..PAGE_SIZE].copy_from_slice(&header.to_bytes());
        mmap.flush()?;

        tracing::debug!(path = %path.as_ref().display(), capacity, "created heap region");

        Ok(HeapRegion {
            mmap,
            header,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Map an existing region and validate its header.
    ///
    /// Never reformats: a file that does not carry a valid header is
    /// rejected rather than overwritten.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        // SAFETY: see `create`.
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        if mmap.len() < PAGE_SIZE {
            return Err(HeapError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "Region file smaller than one page",
            )));
        }

        let header = Header::from_bytes(&mmap[..PAGE_SIZE])?;

        tracing::debug!(
            path = %path.as_ref().display(),
            capacity = header.capacity,
            "opened heap region"
        );

        Ok(HeapRegion {
            mmap,
            header,
            path: path.as_ref().to_path_buf(),
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Persist header mutations back into page 0 (recomputes the checksum)
    pub fn update_header(&mut self, header: Header) {
        let mut header = header;
        header.checksum = header.compute_checksum();
        self.mmap[..PAGE_SIZE].copy_from_slice(&header.to_bytes());
        self.header = header;
    }

    fn page_bounds(&self, page_id: u64) -> Result<std::ops::Range<usize>> {
        // mmap.len() >= PAGE_SIZE is guaranteed at create/open
        match (page_id as usize).checked_mul(PAGE_SIZE) {
            Some(start) if start <= self.mmap.len() - PAGE_SIZE => Ok(start..start + PAGE_SIZE),
            _ => Err(HeapError::OutOfSpace {
                requested: page_id,
                available: (self.mmap.len() / PAGE_SIZE) as u64,
            }),
        }
    }

    /// Read a whole page
    pub fn read_page(&self, page_id: u64) -> Result<&[u8]> {
        let bounds = self.page_bounds(page_id)?;
        Ok(&self.mmap[bounds])
    }

    /// Overwrite a whole page
    pub fn write_page(&mut self, page_id: u64, data: &[u8]) -> Result<()> {
        if data.len() != PAGE_SIZE {
            return Err(HeapError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Page data must be exactly {} bytes, got {}", PAGE_SIZE, data.len()),
            )));
        }
        let bounds = self.page_bounds(page_id)?;
        self.mmap[bounds].copy_from_slice(data);
        Ok(())
    }

    /// Read an arbitrary byte range from the data area
    pub fn read_at(&self, offset: u64, len: usize) -> Result<&[u8]> {
        let start = offset as usize;
        let end = start + len;
        if end > self.mmap.len() {
            return Err(HeapError::OutOfSpace {
                requested: end as u64,
                available: self.mmap.len() as u64,
            });
        }
        Ok(&self.mmap[start..end])
    }

    /// Write an arbitrary byte range into the data area
    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let start = offset as usize;
        let end = start + data.len();
        if end > self.mmap.len() {
            return Err(HeapError::OutOfSpace {
                requested: end as u64,
                available: self.mmap.len() as u64,
            });
        }
        self.mmap[start..end].copy_from_slice(data);
        Ok(())
    }

    /// Flush the mapping to the backing file
    pub fn flush(&self) -> Result<()> {
        self.mmap.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn capacity(&self) -> u64 {
        self.mmap.len() as u64
    }
}
