//! Column reader construction.
//!
//! The storage strategy is picked once per open from the format version.
//! Everything downstream of [`open_columns`] is version-agnostic.

use crate::column::{ColumnReader, MappedColumnReader, UnsignedIntColumnReader, V1Decoder};
use crate::error::{Error, Result};
use crate::format::{ColumnConfig, ColumnType};
use crate::page::{PageIndexEntryType, PageIndexKey, PageManager, UnsignedIntPageReader};
use memmap2::Mmap;
use std::sync::Arc;

/// Backing storage shared by all column readers of one table.
#[derive(Debug, Clone)]
pub enum StorageStrategy {
    /// v0.1.0: the whole file, memory-mapped
    Mapped(Arc<Mmap>),
    /// v0.2.0: the page storage engine over the retained file
    Paged(Arc<PageManager>),
}

/// Build a v0.1.0 reader by dispatching on the column's storage type.
pub fn open_column_v1(config: &ColumnConfig, mmap: &Arc<Mmap>) -> Result<ColumnReader> {
    let decoder = V1Decoder::for_encoding(config.storage_type);
    log::debug!(
        "Opening column {} ({:?} via {:?}, rmax={}, dmax={})",
        config.column_name,
        config.storage_type,
        decoder,
        config.rlevel_max,
        config.dlevel_max
    );

    let reader = MappedColumnReader::new(config.clone(), decoder, Arc::clone(mmap))?;
    Ok(ColumnReader::Mapped(reader))
}

/// Build a v0.2.0 reader by dispatching on the column's logical type.
pub fn open_column_v2(config: &ColumnConfig, page_mgr: &Arc<PageManager>) -> Result<ColumnReader> {
    if config.column_id == 0 {
        return Err(Error::corruption(format!(
            "column {} has no column id; paged columns are addressed by id",
            config.column_name
        )));
    }

    let rlevel_reader = (config.rlevel_max > 0).then(|| {
        let key = PageIndexKey::new(config.column_id, PageIndexEntryType::RLevel);
        UnsignedIntPageReader::uint64(key, Arc::clone(page_mgr))
    });
    let dlevel_reader = (config.dlevel_max > 0).then(|| {
        let key = PageIndexKey::new(config.column_id, PageIndexEntryType::DLevel);
        UnsignedIntPageReader::uint64(key, Arc::clone(page_mgr))
    });

    match config.logical_type {
        ColumnType::UnsignedInt => {
            log::debug!(
                "Opening paged column {} (id={}, rlevels={}, dlevels={})",
                config.column_name,
                config.column_id,
                rlevel_reader.is_some(),
                dlevel_reader.is_some()
            );
            let reader = UnsignedIntColumnReader::new(
                config.clone(),
                rlevel_reader,
                dlevel_reader,
                Arc::clone(page_mgr),
            )?;
            Ok(ColumnReader::UnsignedInt(reader))
        }
        other => Err(Error::unsupported_logical(other.as_u32())),
    }
}

/// Build one reader per column, in header order.
pub fn open_columns(strategy: &StorageStrategy, columns: &[ColumnConfig]) -> Result<Vec<ColumnReader>> {
    columns
        .iter()
        .map(|config| match strategy {
            StorageStrategy::Mapped(mmap) => open_column_v1(config, mmap),
            StorageStrategy::Paged(page_mgr) => open_column_v2(config, page_mgr),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ColumnEncoding;
    use memmap2::MmapMut;

    fn empty_body_map() -> Arc<Mmap> {
        // Three zeroed u64s: no entries, no level bytes
        let mmap = MmapMut::map_anon(24).unwrap();
        Arc::new(mmap.make_read_only().unwrap())
    }

    fn config(storage_type: ColumnEncoding, logical_type: ColumnType) -> ColumnConfig {
        ColumnConfig {
            column_id: 3,
            column_name: "c".to_string(),
            storage_type,
            logical_type,
            body_offset: 0,
            body_size: 24,
            rlevel_max: 0,
            dlevel_max: 0,
        }
    }

    #[test]
    fn test_v1_dispatch_table() {
        let mmap = empty_body_map();
        let cases = [
            (ColumnEncoding::BooleanBitPacked, ColumnType::Boolean, V1Decoder::Boolean),
            (ColumnEncoding::UInt32BitPacked, ColumnType::UnsignedInt, V1Decoder::BitPackedInt),
            (ColumnEncoding::UInt32Plain, ColumnType::UnsignedInt, V1Decoder::UInt32),
            (ColumnEncoding::UInt64Plain, ColumnType::UnsignedInt, V1Decoder::UInt64),
            (ColumnEncoding::UInt64Leb128, ColumnType::DateTime, V1Decoder::Leb128),
            (ColumnEncoding::FloatIeee754, ColumnType::Float, V1Decoder::Double),
            (ColumnEncoding::StringPlain, ColumnType::String, V1Decoder::String),
        ];

        for (encoding, logical_type, expected) in cases {
            let reader = open_column_v1(&config(encoding, logical_type), &mmap).unwrap();
            match &reader {
                ColumnReader::Mapped(r) => assert_eq!(r.decoder(), expected),
                other => panic!("expected a mapped reader, got {:?}", other),
            }
            assert_eq!(reader.encoding(), encoding);
            assert_eq!(reader.column_type(), logical_type);
            assert!(reader.read_all().unwrap().is_empty());
        }
    }

    #[test]
    fn test_v1_ignores_logical_type() {
        let mmap = empty_body_map();
        for logical_type in [ColumnType::SignedInt, ColumnType::Other(0)] {
            let reader = open_column_v1(&config(ColumnEncoding::UInt64Plain, logical_type), &mmap).unwrap();
            match &reader {
                ColumnReader::Mapped(r) => assert_eq!(r.decoder(), V1Decoder::UInt64),
                other => panic!("expected a mapped reader, got {:?}", other),
            }
            assert_eq!(reader.column_type(), logical_type);
        }
    }

    #[test]
    fn test_open_columns_preserves_order() {
        let mmap = empty_body_map();
        let mut a = config(ColumnEncoding::UInt64Plain, ColumnType::UnsignedInt);
        a.column_name = "a".to_string();
        let mut b = config(ColumnEncoding::StringPlain, ColumnType::String);
        b.column_name = "b".to_string();

        let readers = open_columns(&StorageStrategy::Mapped(mmap), &[a, b]).unwrap();
        let names: Vec<_> = readers.iter().map(|r| r.config().column_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
