//! v0.2.0 columns: values and levels read lazily from pages.

use crate::column::{ColumnCursor, LevelStream, ValueStream};
use crate::error::Result;
use crate::format::ColumnConfig;
use crate::page::{
    PageIndexEntryType, PageIndexKey, PageManager, UnsignedIntEncoding, UnsignedIntPageReader,
};
use std::sync::Arc;

/// Unsigned integer column over the page storage engine.
///
/// Combines the value stream with optional repetition and definition level
/// streams so records can be reassembled. Nothing is read at construction.
#[derive(Debug)]
pub struct UnsignedIntColumnReader {
    config: ColumnConfig,
    values: UnsignedIntPageReader,
    rlevel_reader: Option<UnsignedIntPageReader>,
    dlevel_reader: Option<UnsignedIntPageReader>,
}

impl UnsignedIntColumnReader {
    /// Create a reader for `config`, with the level readers the caller built.
    ///
    /// Fails if the storage type has no unsigned-integer page encoding.
    pub fn new(
        config: ColumnConfig,
        rlevel_reader: Option<UnsignedIntPageReader>,
        dlevel_reader: Option<UnsignedIntPageReader>,
        page_mgr: Arc<PageManager>,
    ) -> Result<Self> {
        let encoding = UnsignedIntEncoding::for_storage(config.storage_type)?;
        let key = PageIndexKey::new(config.column_id, PageIndexEntryType::Value);
        let values = UnsignedIntPageReader::new(key, encoding, page_mgr);

        Ok(Self { config, values, rlevel_reader, dlevel_reader })
    }

    /// The column's metadata
    pub fn config(&self) -> &ColumnConfig {
        &self.config
    }

    /// The value stream reader
    pub fn value_reader(&self) -> &UnsignedIntPageReader {
        &self.values
    }

    /// The repetition level reader, present when the column is repeated
    pub fn rlevel_reader(&self) -> Option<&UnsignedIntPageReader> {
        self.rlevel_reader.as_ref()
    }

    /// The definition level reader, present when the column is optional or nested
    pub fn dlevel_reader(&self) -> Option<&UnsignedIntPageReader> {
        self.dlevel_reader.as_ref()
    }

    pub(crate) fn cursor(&self) -> ColumnCursor<'_> {
        ColumnCursor::new(
            &self.config,
            self.rlevel_reader.as_ref().map(|r| LevelStream::Paged(r.values())),
            self.dlevel_reader.as_ref().map(|r| LevelStream::Paged(r.values())),
            ValueStream::Paged(self.values.values()),
            None,
        )
    }
}
