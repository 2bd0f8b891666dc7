//! # cstable - A Columnar Table Reader
//!
//! cstable opens columnar table files and decodes their columns. Every column
//! is stored as three streams: repetition levels, definition levels and the
//! values themselves, so nested and optional records can be rebuilt.
//!
//! ## Architecture
//!
//! Two on-disk layouts are supported:
//!
//! - **v0.1.0**: each column body is a contiguous byte range. The whole file
//!   is memory-mapped and columns decode straight out of the mapping.
//! - **v0.2.0**: column streams are split into checksummed pages located
//!   through a page index. Pages are fetched on first read and cached.
//!
//! The layout is selected once when the file is opened; column readers built
//! on either layout expose the same cursor API.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use cstable::TableReader;
//!
//! # fn main() -> Result<(), cstable::Error> {
//! let table = TableReader::open("./events.cst")?;
//! println!("{} records", table.num_records());
//!
//! let reader = table.column_reader("user_id")?;
//! let mut cursor = reader.cursor()?;
//! while let Some(record) = cursor.next_record()? {
//!     for entry in record {
//!         println!("{:?}", entry.value);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Module declarations
pub mod codec;
pub mod column;
pub mod config;
pub mod error;
pub mod format;
pub mod page;

// Re-exports
pub use column::{ColumnCursor, ColumnReader, ColumnValue, Entry};
pub use config::ReaderOptions;
pub use error::{Error, Result};
pub use format::{BinaryFormatVersion, ColumnConfig, ColumnEncoding, ColumnType};
pub use page::{PageManager, PageManagerStats};

use column::{open_columns, StorageStrategy};
use format::read_header;
use memmap2::MmapOptions;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An open columnar table.
///
/// Created by [`TableReader::open`]; immutable afterwards. Dropping it
/// releases the memory map (v0.1.0) or the file descriptor (v0.2.0) once
/// the last column reader sharing it is gone.
///
/// # Thread Safety
///
/// `TableReader` is `Send + Sync`. Column readers hold no read position;
/// each [`ColumnCursor`] does, so any number of threads may decode the same
/// column at once through their own cursors.
#[derive(Debug)]
pub struct TableReader {
    /// Path the table was opened from
    path: PathBuf,

    /// Binary format revision
    version: BinaryFormatVersion,

    /// Authoritative row count
    num_rows: u64,

    /// Column metadata in on-disk order
    columns: Vec<ColumnConfig>,

    /// One reader per column, parallel to `columns`
    readers: Vec<ColumnReader>,

    /// Column name -> position
    by_name: HashMap<String, usize>,

    /// Column id -> position (nonzero ids only)
    by_id: HashMap<u32, usize>,

    /// Backing storage shared by the readers
    storage: StorageStrategy,
}

impl TableReader {
    /// Opens a table with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be opened or read (`Io`)
    /// - The version tag, header or metablock is invalid (`Corruption`)
    /// - A column uses a type outside the implemented set (`UnsupportedEncoding`)
    /// - Column names or ids repeat (`MalformedTable`)
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ReaderOptions::default())
    }

    /// Opens a table with the given options.
    ///
    /// Either a fully constructed reader is returned or nothing is: on
    /// failure every resource acquired so far is released.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ReaderOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Validate options
        options.validate()?;

        // Step 1: Parse the version tag, header and metablock
        let file = File::open(&path)?;
        let table_header = {
            let mut reader = BufReader::new(&file);
            read_header(&mut reader, options.verify_checksums)?
        };
        let version = table_header.version;
        let num_rows = table_header.num_rows();

        // Step 2: Index the columns; uniqueness only needs the header
        let columns = &table_header.header.columns;
        let mut by_name = HashMap::with_capacity(columns.len());
        let mut by_id = HashMap::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            if by_name.insert(column.column_name.clone(), i).is_some() {
                return Err(Error::malformed(format!(
                    "duplicate column name: {}",
                    column.column_name
                )));
            }
            if column.column_id != 0 && by_id.insert(column.column_id, i).is_some() {
                return Err(Error::malformed(format!(
                    "duplicate column id: {}",
                    column.column_id
                )));
            }
        }

        // Step 3: Pick the storage strategy
        let storage = match version {
            BinaryFormatVersion::V0_1_0 => {
                let mut mmap_options = MmapOptions::new();
                if options.populate_mmap {
                    mmap_options.populate();
                }
                // SAFETY: the mapping is read-only and the reader never
                // writes through it. Truncating the file while it is open
                // is outside what the reader supports.
                let mmap = unsafe { mmap_options.map(&file)? };
                drop(file);
                StorageStrategy::Mapped(Arc::new(mmap))
            }
            BinaryFormatVersion::V0_2_0 => {
                let metablock = table_header
                    .metablock
                    .as_ref()
                    .ok_or_else(|| Error::corruption("v0.2.0 table without a metablock"))?;
                let page_mgr = PageManager::new(
                    file,
                    metablock.page_index,
                    metablock.free_index,
                    &options,
                )?;
                StorageStrategy::Paged(Arc::new(page_mgr))
            }
        };

        // Step 4: Build one reader per column
        let columns = table_header.header.columns;
        let readers = open_columns(&storage, &columns)?;
        if readers.len() != columns.len() {
            return Err(Error::malformed(format!(
                "built {} column readers for {} columns",
                readers.len(),
                columns.len()
            )));
        }

        log::info!(
            "Opened table {:?}: version {}, {} columns, {} records",
            path,
            version,
            columns.len(),
            num_rows
        );

        Ok(Self { path, version, num_rows, columns, readers, by_name, by_id, storage })
    }

    /// Gets the reader for a column by name.
    ///
    /// Fails with [`Error::ColumnNotFound`] for an unknown name; the table is
    /// unaffected and later lookups behave normally.
    pub fn column_reader(&self, name: &str) -> Result<&ColumnReader> {
        self.by_name
            .get(name)
            .map(|&i| &self.readers[i])
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    /// Gets the reader for a column by its nonzero id.
    pub fn column_reader_by_id(&self, column_id: u32) -> Result<&ColumnReader> {
        self.by_id
            .get(&column_id)
            .map(|&i| &self.readers[i])
            .ok_or_else(|| Error::ColumnNotFound(format!("#{}", column_id)))
    }

    /// Physical encoding of a column
    pub fn column_encoding(&self, name: &str) -> Result<ColumnEncoding> {
        Ok(self.column_reader(name)?.encoding())
    }

    /// Logical type of a column
    pub fn column_type(&self, name: &str) -> Result<ColumnType> {
        Ok(self.column_reader(name)?.column_type())
    }

    /// All columns in on-disk declaration order
    pub fn columns(&self) -> &[ColumnConfig] {
        &self.columns
    }

    /// Whether a column with this name exists
    pub fn has_column(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Number of records in the table
    pub fn num_records(&self) -> u64 {
        self.num_rows
    }

    /// Binary format revision of the file
    pub fn version(&self) -> BinaryFormatVersion {
        self.version
    }

    /// Path the table was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The page storage engine, for v0.2.0 tables
    pub fn page_manager(&self) -> Option<&PageManager> {
        match &self.storage {
            StorageStrategy::Paged(page_mgr) => Some(page_mgr.as_ref()),
            StorageStrategy::Mapped(_) => None,
        }
    }

    /// Summary of the table's metadata and I/O statistics
    pub fn info(&self) -> TableInfo {
        TableInfo {
            path: self.path.display().to_string(),
            version: self.version,
            num_records: self.num_rows,
            columns: self.columns.clone(),
            page_stats: self.page_manager().map(PageManager::stats),
        }
    }
}

/// Serializable summary returned by [`TableReader::info`].
#[derive(Debug, Clone, Serialize)]
pub struct TableInfo {
    /// Path the table was opened from
    pub path: String,
    /// Binary format revision
    pub version: BinaryFormatVersion,
    /// Number of records
    pub num_records: u64,
    /// Columns in on-disk order
    pub columns: Vec<ColumnConfig>,
    /// Page I/O statistics (v0.2.0 only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_stats: Option<PageManagerStats>,
}

impl TableInfo {
    /// Render as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
