//! Page index and free-space index decoding.
//!
//! The page index maps every `(column_id, entry_type)` key to the ordered
//! list of pages holding that stream.
//!
//! Payload format:
//! ```text
//! [num_entries: u32]
//! [entry]*:
//!   [column_id: u32][entry_type: u8][num_pages: u32][PageRef: 16 bytes]*
//! ```

use crate::error::{Error, Result};
use crate::format::PageRef;
use crate::page::{PageIndexEntryType, PageIndexKey};
use bytes::Buf;
use std::collections::HashMap;

/// Decoded page index.
#[derive(Debug, Default)]
pub struct PageIndex {
    entries: HashMap<PageIndexKey, Vec<PageRef>>,
}

impl PageIndex {
    /// Decode the page index from a page payload
    pub fn decode(mut data: &[u8]) -> Result<Self> {
        let num_entries = read_count(&mut data, "page index")?;
        let mut entries = HashMap::with_capacity(num_entries.min(1024));

        for _ in 0..num_entries {
            if data.remaining() < 9 {
                return Err(Error::corruption("Page index entry too short"));
            }
            let column_id = data.get_u32_le();
            let entry_type = PageIndexEntryType::from_u8(data.get_u8())?;
            let num_pages = data.get_u32_le() as usize;

            let mut pages = Vec::with_capacity(num_pages.min(1024));
            for _ in 0..num_pages {
                pages.push(PageRef::decode_from(&mut data)?);
            }

            let key = PageIndexKey::new(column_id, entry_type);
            if entries.insert(key, pages).is_some() {
                return Err(Error::corruption(format!(
                    "Duplicate page index entry for column {} ({:?})",
                    column_id, entry_type
                )));
            }
        }

        if data.has_remaining() {
            return Err(Error::corruption(format!(
                "{} trailing bytes after page index",
                data.remaining()
            )));
        }

        Ok(Self { entries })
    }

    /// Pages for a key, in stream order; empty if the key is absent
    pub fn lookup(&self, key: &PageIndexKey) -> &[PageRef] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the index has an entry for `key`
    pub fn contains(&self, key: &PageIndexKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of keys in the index
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of pages across all keys
    pub fn num_pages(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

/// Decode a free-space index payload: `[num_refs: u32][PageRef]*`.
pub fn decode_free_index(mut data: &[u8]) -> Result<Vec<PageRef>> {
    let num_refs = read_count(&mut data, "free index")?;
    let mut refs = Vec::with_capacity(num_refs.min(1024));
    for _ in 0..num_refs {
        refs.push(PageRef::decode_from(&mut data)?);
    }
    Ok(refs)
}

fn read_count(data: &mut &[u8], what: &str) -> Result<usize> {
    if data.remaining() < 4 {
        return Err(Error::corruption(format!("{} too short", what)));
    }
    Ok(data.get_u32_le() as usize)
}
