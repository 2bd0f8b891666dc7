//! Page storage engine for v0.2.0 tables.
//!
//! The manager owns the table's file descriptor for the lifetime of the
//! reader. Positioned reads (seek + read) share one cursor, so they are
//! serialized behind a mutex; decoded payloads are shared through the
//! page cache. Both make `PageManager` safe to use from many cursors at once.

use crate::config::{CompressionType, ReaderOptions};
use crate::error::{Error, Result};
use crate::format::PageRef;
use crate::page::cache::{CacheStats, PageCache};
use crate::page::index::{decode_free_index, PageIndex};
use crate::page::{PageIndexKey, PAGE_TRAILER_SIZE};
use bytes::Bytes;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicU64, Ordering};

/// I/O counters for a page manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct PageManagerStats {
    /// Pages read from the file (cache misses)
    pub pages_read: u64,
    /// Bytes read from the file, trailers included
    pub bytes_read: u64,
    /// Page cache statistics
    pub cache: CacheStats,
}

/// Resolves page index keys to pages and fetches page payloads.
#[derive(Debug)]
pub struct PageManager {
    file: Mutex<File>,
    file_size: u64,
    index: PageIndex,
    free_index: Option<PageRef>,
    cache: PageCache,
    verify_checksums: bool,
    pages_read: AtomicU64,
    bytes_read: AtomicU64,
}

impl PageManager {
    /// Build a page manager over an open table file.
    ///
    /// Reads and decodes the page index page; no column page is touched.
    pub fn new(
        file: File,
        page_index: PageRef,
        free_index: Option<PageRef>,
        options: &ReaderOptions,
    ) -> Result<Self> {
        let file_size = file.metadata()?.len();

        let mut manager = Self {
            file: Mutex::new(file),
            file_size,
            index: PageIndex::default(),
            free_index,
            cache: PageCache::new(options.page_cache_size),
            verify_checksums: options.verify_checksums,
            pages_read: AtomicU64::new(0),
            bytes_read: AtomicU64::new(0),
        };

        let index_data = manager.read_page_uncached(&page_index)?;
        manager.index = PageIndex::decode(&index_data)?;
        log::debug!(
            "Loaded page index: {} streams, {} pages",
            manager.index.len(),
            manager.index.num_pages()
        );

        Ok(manager)
    }

    /// Pages holding the stream for `key`, in order
    pub fn lookup(&self, key: &PageIndexKey) -> &[PageRef] {
        self.index.lookup(key)
    }

    /// Read a page payload, going through the cache
    pub fn read_page(&self, page: &PageRef) -> Result<Bytes> {
        if let Some(data) = self.cache.get(page) {
            return Ok(data);
        }

        let data = self.read_page_uncached(page)?;
        self.cache.insert(*page, data.clone());
        Ok(data)
    }

    /// Reference to the free-space index page, if the table has one
    pub fn free_index(&self) -> Option<PageRef> {
        self.free_index
    }

    /// Read the free-space index
    pub fn free_pages(&self) -> Result<Vec<PageRef>> {
        match &self.free_index {
            Some(page) => decode_free_index(&self.read_page(page)?),
            None => Ok(Vec::new()),
        }
    }

    /// Size of the underlying file
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Get I/O and cache statistics
    pub fn stats(&self) -> PageManagerStats {
        PageManagerStats {
            pages_read: self.pages_read.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            cache: self.cache.stats(),
        }
    }

    fn read_page_uncached(&self, page: &PageRef) -> Result<Bytes> {
        let end = page
            .end_offset()
            .filter(|&end| end <= self.file_size)
            .ok_or_else(|| {
                Error::corruption(format!(
                    "Page at {} ({} bytes) lies outside the file ({} bytes)",
                    page.offset, page.size, self.file_size
                ))
            })?;
        let total_size = (end - page.offset) as usize;
        if total_size < PAGE_TRAILER_SIZE {
            return Err(Error::corruption("Page size too small"));
        }

        let mut buffer = vec![0u8; total_size];
        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(page.offset))?;
            file.read_exact(&mut buffer)?;
        }
        self.pages_read.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(total_size as u64, Ordering::Relaxed);

        // Layout: [data...][compression_type: 1 byte][checksum: 4 bytes]
        let data_size = total_size - PAGE_TRAILER_SIZE;
        let data = &buffer[..data_size];
        let compression_type = buffer[data_size];
        let mut checksum_bytes = [0u8; 4];
        checksum_bytes.copy_from_slice(&buffer[data_size + 1..]);
        let stored_checksum = u32::from_le_bytes(checksum_bytes);

        if self.verify_checksums {
            let computed_checksum = crc32fast::hash(data);
            if computed_checksum != stored_checksum {
                log::warn!(
                    "Checksum mismatch in page at offset {}: stored {:#x}, computed {:#x}",
                    page.offset,
                    stored_checksum,
                    computed_checksum
                );
                return Err(Error::ChecksumMismatch {
                    expected: stored_checksum,
                    actual: computed_checksum,
                });
            }
        }

        let compression = CompressionType::from_u8(compression_type).ok_or_else(|| {
            Error::corruption(format!("Invalid page compression type: {}", compression_type))
        })?;

        let payload = match compression {
            CompressionType::None => data.to_vec(),
            #[cfg(feature = "snappy")]
            CompressionType::Snappy => snap::raw::Decoder::new()
                .decompress_vec(data)
                .map_err(|e| Error::corruption(format!("Snappy decompression failed: {}", e)))?,
            #[cfg(feature = "lz4-compression")]
            CompressionType::Lz4 => lz4::block::decompress(data, None)
                .map_err(|e| Error::corruption(format!("LZ4 decompression failed: {}", e)))?,
        };

        Ok(Bytes::from(payload))
    }
}
