//! Paged column storage (binary format v0.2.0).
//!
//! A column's values, repetition levels and definition levels are three
//! independent streams. Each stream is a list of pages found through the
//! page index under a [`PageIndexKey`].
//!
//! ## Page Format
//!
//! ```text
//! [payload]            // stored (possibly compressed) bytes
//! [compression: u8]    // CompressionType
//! [checksum: u32]      // crc32 of the stored payload
//! ```

pub mod cache;
pub mod index;
pub mod manager;
pub mod reader;

pub use cache::{CacheStats, PageCache};
pub use index::PageIndex;
pub use manager::{PageManager, PageManagerStats};
pub use reader::{UnsignedIntEncoding, UnsignedIntPageIter, UnsignedIntPageReader};

use crate::error::{Error, Result};
use serde::Serialize;

/// Size of the trailer after every page payload (compression + crc32).
pub const PAGE_TRAILER_SIZE: usize = 5;

/// Which stream of a column a page belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum PageIndexEntryType {
    /// Column values
    Value = 0,
    /// Repetition levels
    RLevel = 1,
    /// Definition levels
    DLevel = 2,
}

impl PageIndexEntryType {
    /// Convert from u8
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(PageIndexEntryType::Value),
            1 => Ok(PageIndexEntryType::RLevel),
            2 => Ok(PageIndexEntryType::DLevel),
            _ => Err(Error::Corruption(format!("Invalid page index entry type: {}", value))),
        }
    }
}

/// Identifies one stream of one column in the page index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PageIndexKey {
    /// Owning column
    pub column_id: u32,
    /// Stream kind
    pub entry_type: PageIndexEntryType,
}

impl PageIndexKey {
    /// Create a new PageIndexKey
    pub fn new(column_id: u32, entry_type: PageIndexEntryType) -> Self {
        Self { column_id, entry_type }
    }
}
