//! On-disk format definitions shared by both binary format revisions.
//!
//! ## File Format
//!
//! ```text
//! [Version Tag: 6B]    // "CSTB" + u16 version
//! [Header]             // flags, (v0.1.0: num_rows), column table
//! [MetaBlock: 44B]     // v0.2.0 only: num_rows, page index, free index, crc
//! [Column Data]        // v0.1.0: contiguous column bodies
//!                      // v0.2.0: checksummed pages addressed by the page index
//! ```
//!
//! All integers are little-endian.

pub mod header;
pub mod page_ref;

pub use header::{read_header, FileHeader, MetaBlock, TableHeader};
pub use page_ref::PageRef;

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Magic bytes at the start of every cstable file.
pub const MAGIC_BYTES: [u8; 4] = *b"CSTB";

/// Size of an encoded v0.2.0 metablock, checksum included.
pub const METABLOCK_SIZE: usize = 44;

/// Size of the fixed prefix of a v0.1.0 column body.
pub const V1_BODY_HEADER_SIZE: usize = 24;

/// Binary format revisions understood by this reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryFormatVersion {
    /// Monolithic layout: one contiguous, memory-mapped body per column.
    #[serde(rename = "v0.1.0")]
    V0_1_0,
    /// Paged layout: values and levels in pages addressed by a page index.
    #[serde(rename = "v0.2.0")]
    V0_2_0,
}

impl BinaryFormatVersion {
    /// Convert from the on-disk u16
    pub fn from_u16(value: u16) -> Result<Self> {
        match value {
            1 => Ok(BinaryFormatVersion::V0_1_0),
            2 => Ok(BinaryFormatVersion::V0_2_0),
            _ => Err(Error::Corruption(format!("unknown binary format version: {}", value))),
        }
    }

    /// The on-disk u16
    pub fn as_u16(self) -> u16 {
        match self {
            BinaryFormatVersion::V0_1_0 => 1,
            BinaryFormatVersion::V0_2_0 => 2,
        }
    }
}

impl fmt::Display for BinaryFormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryFormatVersion::V0_1_0 => f.write_str("v0.1.0"),
            BinaryFormatVersion::V0_2_0 => f.write_str("v0.2.0"),
        }
    }
}

/// Physical storage encoding of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u32)]
pub enum ColumnEncoding {
    /// One bit per boolean.
    BooleanBitPacked = 1,
    /// Unsigned 32-bit integers packed to a fixed bit width.
    UInt32BitPacked = 10,
    /// Unsigned 32-bit integers, 4 bytes each.
    UInt32Plain = 11,
    /// Unsigned 64-bit integers, 8 bytes each.
    UInt64Plain = 12,
    /// Unsigned 64-bit integers as LEB128 varints.
    UInt64Leb128 = 13,
    /// IEEE-754 doubles, 8 bytes each.
    FloatIeee754 = 14,
    /// u32 length-prefixed UTF-8 strings.
    StringPlain = 100,
}

impl ColumnEncoding {
    /// Convert from the on-disk tag
    pub fn from_u32(value: u32) -> Result<Self> {
        match value {
            1 => Ok(ColumnEncoding::BooleanBitPacked),
            10 => Ok(ColumnEncoding::UInt32BitPacked),
            11 => Ok(ColumnEncoding::UInt32Plain),
            12 => Ok(ColumnEncoding::UInt64Plain),
            13 => Ok(ColumnEncoding::UInt64Leb128),
            14 => Ok(ColumnEncoding::FloatIeee754),
            100 => Ok(ColumnEncoding::StringPlain),
            _ => Err(Error::unsupported_storage(value)),
        }
    }

    /// The on-disk tag
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Logical (semantic) type of a column, independent of its encoding.
///
/// v0.1.0 columns decode by storage type alone, so a logical tag this reader
/// does not know is kept as [`ColumnType::Other`] rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ColumnType {
    /// true / false
    Boolean,
    /// Unsigned integer
    UnsignedInt,
    /// Signed integer
    SignedInt,
    /// Double precision float
    Float,
    /// UTF-8 string
    String,
    /// Microseconds since epoch, stored as an unsigned integer
    DateTime,
    /// A tag outside the known set
    Other(u32),
}

impl ColumnType {
    /// Convert from the on-disk tag
    pub fn from_u32(value: u32) -> Self {
        match value {
            1 => ColumnType::Boolean,
            2 => ColumnType::UnsignedInt,
            3 => ColumnType::SignedInt,
            4 => ColumnType::Float,
            5 => ColumnType::String,
            6 => ColumnType::DateTime,
            other => ColumnType::Other(other),
        }
    }

    /// The on-disk tag
    pub fn as_u32(self) -> u32 {
        match self {
            ColumnType::Boolean => 1,
            ColumnType::UnsignedInt => 2,
            ColumnType::SignedInt => 3,
            ColumnType::Float => 4,
            ColumnType::String => 5,
            ColumnType::DateTime => 6,
            ColumnType::Other(tag) => tag,
        }
    }
}

/// Per-column metadata as declared in the file header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnConfig {
    /// Numeric id; 0 means no stable id was assigned.
    pub column_id: u32,
    /// Column name, unique within a table.
    pub column_name: String,
    /// Physical encoding.
    pub storage_type: ColumnEncoding,
    /// Logical type.
    pub logical_type: ColumnType,
    /// Offset of the column body in the file (v0.1.0 only).
    pub body_offset: u64,
    /// Size of the column body in bytes (v0.1.0 only).
    pub body_size: u64,
    /// Maximum repetition level.
    pub rlevel_max: u32,
    /// Maximum definition level.
    pub dlevel_max: u32,
}

impl ColumnConfig {
    /// Whether the column is neither repeated nor nested under optional fields.
    pub fn is_flat(&self) -> bool {
        self.rlevel_max == 0 && self.dlevel_max == 0
    }

    /// Exclusive end offset of the column body.
    pub fn body_end(&self) -> Option<u64> {
        self.body_offset.checked_add(self.body_size)
    }
}
