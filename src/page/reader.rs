//! Lazily bound unsigned-integer page readers.
//!
//! An [`UnsignedIntPageReader`] is cheap to construct: it records the page
//! index key, the stream encoding and a handle to the shared page manager.
//! Pages are only fetched once an [`UnsignedIntPageIter`] asks for a value.

use crate::codec::leb128;
use crate::codec::plain::FixedWidth;
use crate::error::{Error, Result};
use crate::format::ColumnEncoding;
use crate::page::{PageIndexKey, PageManager};
use bytes::Bytes;
use std::sync::Arc;

/// How unsigned integers are laid out inside a page stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsignedIntEncoding {
    /// 4-byte little-endian
    Plain32,
    /// 8-byte little-endian
    Plain64,
    /// LEB128 varints
    Leb128,
}

impl UnsignedIntEncoding {
    /// Page encoding for a column stored as `storage_type`
    pub fn for_storage(storage_type: ColumnEncoding) -> Result<Self> {
        match storage_type {
            ColumnEncoding::UInt32Plain => Ok(UnsignedIntEncoding::Plain32),
            ColumnEncoding::UInt64Plain => Ok(UnsignedIntEncoding::Plain64),
            ColumnEncoding::UInt64Leb128 => Ok(UnsignedIntEncoding::Leb128),
            other => Err(Error::unsupported_storage(other.as_u32())),
        }
    }

    /// Decode one value from the front of `data`, returning it and its length
    fn decode(self, data: &[u8]) -> Result<(u64, usize)> {
        let width = match self {
            UnsignedIntEncoding::Leb128 => return leb128::decode_u64(data),
            UnsignedIntEncoding::Plain32 => u32::WIDTH,
            UnsignedIntEncoding::Plain64 => u64::WIDTH,
        };
        if data.len() < width {
            return Err(Error::corruption("unsigned integer straddles a page boundary"));
        }
        let value = match self {
            UnsignedIntEncoding::Plain32 => u32::from_le_slice(&data[..width]) as u64,
            _ => u64::from_le_slice(&data[..width]),
        };
        Ok((value, width))
    }
}

/// Reader for one unsigned-integer stream of a paged column.
#[derive(Debug, Clone)]
pub struct UnsignedIntPageReader {
    key: PageIndexKey,
    encoding: UnsignedIntEncoding,
    page_mgr: Arc<PageManager>,
}

impl UnsignedIntPageReader {
    /// Bind a reader to `key`; performs no I/O
    pub fn new(key: PageIndexKey, encoding: UnsignedIntEncoding, page_mgr: Arc<PageManager>) -> Self {
        Self { key, encoding, page_mgr }
    }

    /// Reader for a stream of 8-byte integers (repetition and definition levels)
    pub fn uint64(key: PageIndexKey, page_mgr: Arc<PageManager>) -> Self {
        Self::new(key, UnsignedIntEncoding::Plain64, page_mgr)
    }

    /// The page index key this reader is bound to
    pub fn key(&self) -> PageIndexKey {
        self.key
    }

    /// The stream encoding
    pub fn encoding(&self) -> UnsignedIntEncoding {
        self.encoding
    }

    /// Start reading the stream from its first page
    pub fn values(&self) -> UnsignedIntPageIter {
        UnsignedIntPageIter {
            reader: self.clone(),
            next_page: 0,
            current: Bytes::new(),
            pos: 0,
        }
    }
}

/// Sequential position in an unsigned-integer page stream.
#[derive(Debug)]
pub struct UnsignedIntPageIter {
    reader: UnsignedIntPageReader,
    next_page: usize,
    current: Bytes,
    pos: usize,
}

impl UnsignedIntPageIter {
    /// Decode the next value, fetching the next page when the current one is used up
    pub fn next_value(&mut self) -> Result<Option<u64>> {
        while self.pos >= self.current.len() {
            let mgr = &self.reader.page_mgr;
            let page = match mgr.lookup(&self.reader.key).get(self.next_page) {
                Some(page) => *page,
                None => return Ok(None),
            };
            self.current = mgr.read_page(&page)?;
            self.pos = 0;
            self.next_page += 1;
        }

        let (value, len) = self.reader.encoding.decode(&self.current[self.pos..])?;
        self.pos += len;
        Ok(Some(value))
    }

    /// Number of pages fetched so far
    pub fn pages_loaded(&self) -> usize {
        self.next_page
    }
}
