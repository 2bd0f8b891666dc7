//! Configuration options for opening cstable files.

/// Smallest nonzero page cache capacity accepted by [`ReaderOptions::validate`].
pub const MIN_PAGE_CACHE_SIZE: usize = 4 * 1024;

/// Configuration options for opening a table.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Page cache capacity for paged (v0.2.0) tables, in bytes.
    /// Set to 0 to disable caching.
    /// Default: 8MB
    pub page_cache_size: usize,

    /// Verify metablock and page checksums.
    /// Default: true
    pub verify_checksums: bool,

    /// Prefault the whole mapping when opening a v0.1.0 table.
    /// Default: false
    pub populate_mmap: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            page_cache_size: 8 * 1024 * 1024, // 8MB
            verify_checksums: true,
            populate_mmap: false,
        }
    }
}

/// Compression algorithms a page may be stored with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompressionType {
    /// No compression.
    None = 0,

    /// Snappy compression (fast, moderate compression ratio).
    #[cfg(feature = "snappy")]
    Snappy = 1,

    /// LZ4 compression (very fast, lower compression ratio).
    #[cfg(feature = "lz4-compression")]
    Lz4 = 2,
}

impl CompressionType {
    /// Convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(CompressionType::None),
            #[cfg(feature = "snappy")]
            1 => Some(CompressionType::Snappy),
            #[cfg(feature = "lz4-compression")]
            2 => Some(CompressionType::Lz4),
            _ => None,
        }
    }
}

impl ReaderOptions {
    /// Creates a new ReaderOptions with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page cache size.
    pub fn page_cache_size(mut self, size: usize) -> Self {
        self.page_cache_size = size;
        self
    }

    /// Enables or disables checksum verification.
    pub fn verify_checksums(mut self, value: bool) -> Self {
        self.verify_checksums = value;
        self
    }

    /// Enables or disables prefaulting of the v0.1.0 mapping.
    pub fn populate_mmap(mut self, value: bool) -> Self {
        self.populate_mmap = value;
        self
    }

    /// Validates the options and returns an error if any are invalid.
    pub fn validate(&self) -> crate::Result<()> {
        if self.page_cache_size != 0 && self.page_cache_size < MIN_PAGE_CACHE_SIZE {
            return Err(crate::Error::invalid_argument(format!(
                "page_cache_size must be 0 or at least {} bytes",
                MIN_PAGE_CACHE_SIZE
            )));
        }
        Ok(())
    }
}
