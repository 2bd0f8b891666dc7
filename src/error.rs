//! Error types for the cstable reader.

use std::fmt;
use std::io;
use thiserror::Error;

/// The result type used throughout cstable.
pub type Result<T> = std::result::Result<T, Error>;

/// Which enumeration an unsupported numeric tag came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// A physical storage encoding (`ColumnEncoding`).
    Storage,
    /// A logical column type (`ColumnType`).
    Logical,
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagKind::Storage => f.write_str("storage"),
            TagKind::Logical => f.write_str("logical"),
        }
    }
}

/// The error type for cstable operations.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error occurred while opening or reading the file.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The file is not a readable cstable: bad version tag, truncated
    /// header or metablock, or a malformed column body.
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// A storage or logical type outside the implemented set.
    #[error("unsupported column type: {tag} ({kind} tag)")]
    UnsupportedEncoding {
        /// Which enumeration the tag belongs to.
        kind: TagKind,
        /// The offending numeric tag.
        tag: u32,
    },

    /// The table failed an internal consistency check.
    #[error("Malformed table: {0}")]
    MalformedTable(String),

    /// The requested column does not exist in the table.
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// A checksum mismatch was detected.
    #[error("Checksum mismatch: expected {expected:#x}, got {actual:#x}")]
    ChecksumMismatch {
        /// The expected checksum value.
        expected: u32,
        /// The actual checksum value.
        actual: u32,
    },

    /// An invalid argument was provided.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Table metadata could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl Error {
    /// Creates a new corruption error.
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    /// Creates a new malformed table error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedTable(msg.into())
    }

    /// Creates a new invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Creates an unsupported storage encoding error.
    pub fn unsupported_storage(tag: u32) -> Self {
        Error::UnsupportedEncoding { kind: TagKind::Storage, tag }
    }

    /// Creates an unsupported logical type error.
    pub fn unsupported_logical(tag: u32) -> Self {
        Error::UnsupportedEncoding { kind: TagKind::Logical, tag }
    }

    /// Returns true if the error means the file itself cannot be used.
    ///
    /// `ColumnNotFound` and `InvalidArgument` are caller mistakes and
    /// `Serialization` concerns only the metadata dump; everything else is
    /// reported by the file or the OS.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::ColumnNotFound(_) | Error::InvalidArgument(_) | Error::Serialization(_)
        )
    }
}
