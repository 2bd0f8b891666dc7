//! Page locators.

use crate::error::{Error, Result};
use bytes::{Buf, BufMut};
use serde::Serialize;

/// PageRef points to one page region in a v0.2.0 file.
///
/// It contains the offset and size of the region, trailer included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PageRef {
    /// Offset of the page in the file
    pub offset: u64,
    /// Size of the page region in bytes
    pub size: u64,
}

impl PageRef {
    /// Encoded size (8 for offset + 8 for size)
    pub const ENCODED_SIZE: usize = 16;

    /// Create a new PageRef
    pub fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }

    /// Encode the PageRef to bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::ENCODED_SIZE);
        buf.put_u64_le(self.offset);
        buf.put_u64_le(self.size);
        buf
    }

    /// Decode a PageRef from the front of `buf`, advancing it
    pub fn decode_from<B: Buf>(buf: &mut B) -> Result<Self> {
        if buf.remaining() < Self::ENCODED_SIZE {
            return Err(Error::corruption("PageRef too short"));
        }

        let offset = buf.get_u64_le();
        let size = buf.get_u64_le();

        Ok(Self { offset, size })
    }

    /// Get the end offset of this page
    pub fn end_offset(&self) -> Option<u64> {
        self.offset.checked_add(self.size)
    }

    /// Whether the ref points at nothing
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}
