//! Column readers and the record cursor shared by both storage layouts.
//!
//! A [`ColumnReader`] is created once per column when a table is opened and
//! holds no read position. Decoding happens through a [`ColumnCursor`], which
//! walks the column entry by entry:
//!
//! - the repetition level says at which repeated field the entry restarts
//!   (0 starts a new record),
//! - the definition level says how many optional/repeated ancestors are
//!   present; a value exists only when it equals the column's maximum.

pub mod factory;
pub mod v1;
pub mod v2;

pub use factory::{open_column_v1, open_column_v2, open_columns, StorageStrategy};
pub use v1::{MappedColumnReader, V1Decoder};
pub use v2::UnsignedIntColumnReader;

use crate::codec::{BitPackedDecoder, Decoder, FixedWidthDecoder, Leb128Decoder, StringDecoder};
use crate::error::{Error, Result};
use crate::format::{BinaryFormatVersion, ColumnConfig, ColumnEncoding, ColumnType};
use crate::page::UnsignedIntPageIter;

/// A decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    /// Boolean value
    Boolean(bool),
    /// Unsigned integer value
    UnsignedInt(u64),
    /// Float value
    Float(f64),
    /// String value
    String(String),
}

impl ColumnValue {
    /// The boolean, if this is a boolean value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ColumnValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// The integer, if this is an unsigned integer value
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ColumnValue::UnsignedInt(v) => Some(*v),
            _ => None,
        }
    }

    /// The float, if this is a float value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ColumnValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// The string, if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ColumnValue::String(v) => Some(v),
            _ => None,
        }
    }
}

/// One position in a column: its levels and, when defined, its value.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Repetition level
    pub rlevel: u32,
    /// Definition level
    pub dlevel: u32,
    /// The value; `None` when `dlevel` is below the column's maximum
    pub value: Option<ColumnValue>,
}

/// Reader for one column of an open table.
#[derive(Debug)]
pub enum ColumnReader {
    /// A v0.1.0 column decoded in place from the memory map
    Mapped(MappedColumnReader),
    /// A v0.2.0 unsigned integer column read from pages
    UnsignedInt(UnsignedIntColumnReader),
}

impl ColumnReader {
    /// The column's metadata
    pub fn config(&self) -> &ColumnConfig {
        match self {
            ColumnReader::Mapped(r) => r.config(),
            ColumnReader::UnsignedInt(r) => r.config(),
        }
    }

    /// Physical encoding of the column
    pub fn encoding(&self) -> ColumnEncoding {
        self.config().storage_type
    }

    /// Logical type of the column
    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnReader::Mapped(r) => r.config().logical_type,
            ColumnReader::UnsignedInt(_) => ColumnType::UnsignedInt,
        }
    }

    /// Maximum repetition level
    pub fn rlevel_max(&self) -> u32 {
        self.config().rlevel_max
    }

    /// Maximum definition level
    pub fn dlevel_max(&self) -> u32 {
        self.config().dlevel_max
    }

    /// The format revision backing this reader
    pub fn version(&self) -> BinaryFormatVersion {
        match self {
            ColumnReader::Mapped(_) => BinaryFormatVersion::V0_1_0,
            ColumnReader::UnsignedInt(_) => BinaryFormatVersion::V0_2_0,
        }
    }

    /// Start reading the column from its first entry
    pub fn cursor(&self) -> Result<ColumnCursor<'_>> {
        match self {
            ColumnReader::Mapped(r) => r.cursor(),
            ColumnReader::UnsignedInt(r) => Ok(r.cursor()),
        }
    }

    /// Decode every entry of the column
    pub fn read_all(&self) -> Result<Vec<Entry>> {
        self.cursor()?.collect()
    }
}

/// A repetition or definition level stream.
#[derive(Debug)]
pub(crate) enum LevelStream<'a> {
    Packed(BitPackedDecoder<'a>),
    Paged(UnsignedIntPageIter),
}

impl LevelStream<'_> {
    fn next_level(&mut self) -> Result<Option<u64>> {
        match self {
            LevelStream::Packed(d) => Ok(d.next_value()?.map(u64::from)),
            LevelStream::Paged(it) => it.next_value(),
        }
    }
}

/// A value stream; one variant per decoder.
#[derive(Debug)]
pub(crate) enum ValueStream<'a> {
    Boolean(BitPackedDecoder<'a>),
    BitPackedInt(BitPackedDecoder<'a>),
    UInt32(FixedWidthDecoder<'a, u32>),
    UInt64(FixedWidthDecoder<'a, u64>),
    Leb128(Leb128Decoder<'a>),
    Double(FixedWidthDecoder<'a, f64>),
    String(StringDecoder<'a>),
    Paged(UnsignedIntPageIter),
}

impl ValueStream<'_> {
    fn next_value(&mut self) -> Result<Option<ColumnValue>> {
        let value = match self {
            ValueStream::Boolean(d) => d.next_value()?.map(|v| ColumnValue::Boolean(v != 0)),
            ValueStream::BitPackedInt(d) => {
                d.next_value()?.map(|v| ColumnValue::UnsignedInt(v as u64))
            }
            ValueStream::UInt32(d) => d.next_value()?.map(|v| ColumnValue::UnsignedInt(v as u64)),
            ValueStream::UInt64(d) => d.next_value()?.map(ColumnValue::UnsignedInt),
            ValueStream::Leb128(d) => d.next_value()?.map(ColumnValue::UnsignedInt),
            ValueStream::Double(d) => d.next_value()?.map(ColumnValue::Float),
            ValueStream::String(d) => d.next_value()?.map(ColumnValue::String),
            ValueStream::Paged(it) => it.next_value()?.map(ColumnValue::UnsignedInt),
        };
        Ok(value)
    }
}

/// Sequential read position in one column.
///
/// Created by [`ColumnReader::cursor`]. Any number of cursors may read the
/// same column concurrently; each keeps its own position.
#[derive(Debug)]
pub struct ColumnCursor<'a> {
    rlevel_max: u32,
    dlevel_max: u32,
    rlevels: Option<LevelStream<'a>>,
    dlevels: Option<LevelStream<'a>>,
    values: ValueStream<'a>,
    /// Entries left when the entry count is stored up front (v0.1.0)
    remaining: Option<u64>,
    peeked: Option<Entry>,
    entries_read: u64,
    eof: bool,
}

impl<'a> ColumnCursor<'a> {
    pub(crate) fn new(
        config: &ColumnConfig,
        rlevels: Option<LevelStream<'a>>,
        dlevels: Option<LevelStream<'a>>,
        values: ValueStream<'a>,
        remaining: Option<u64>,
    ) -> Self {
        Self {
            rlevel_max: config.rlevel_max,
            dlevel_max: config.dlevel_max,
            rlevels,
            dlevels,
            values,
            remaining,
            peeked: None,
            entries_read: 0,
            eof: false,
        }
    }

    /// Read the next entry
    pub fn next_entry(&mut self) -> Result<Option<Entry>> {
        let entry = match self.peeked.take() {
            Some(entry) => Some(entry),
            None => self.read_entry()?,
        };
        if entry.is_some() {
            self.entries_read += 1;
        }
        Ok(entry)
    }

    /// Look at the next entry without consuming it
    pub fn peek_entry(&mut self) -> Result<Option<&Entry>> {
        if self.peeked.is_none() {
            self.peeked = self.read_entry()?;
        }
        Ok(self.peeked.as_ref())
    }

    /// Repetition level of the next entry, `None` at the end of the column
    pub fn peek_repetition_level(&mut self) -> Result<Option<u32>> {
        Ok(self.peek_entry()?.map(|e| e.rlevel))
    }

    /// Whether every entry has been read
    pub fn is_eof(&mut self) -> Result<bool> {
        Ok(self.peek_entry()?.is_none())
    }

    /// Skip up to `n` entries, returning how many were skipped
    pub fn skip_entries(&mut self, n: u64) -> Result<u64> {
        let mut skipped = 0;
        while skipped < n && self.next_entry()?.is_some() {
            skipped += 1;
        }
        Ok(skipped)
    }

    /// Read all entries of the next record.
    ///
    /// A record starts at an entry with repetition level 0 and extends over
    /// every following entry with a nonzero repetition level.
    pub fn next_record(&mut self) -> Result<Option<Vec<Entry>>> {
        let first = match self.next_entry()? {
            Some(entry) => entry,
            None => return Ok(None),
        };
        if first.rlevel != 0 {
            return Err(Error::corruption(format!(
                "record starts at repetition level {} after entry {}",
                first.rlevel, self.entries_read
            )));
        }

        let mut record = vec![first];
        while let Some(rlevel) = self.peek_repetition_level()? {
            if rlevel == 0 {
                break;
            }
            match self.next_entry()? {
                Some(entry) => record.push(entry),
                None => break,
            }
        }
        Ok(Some(record))
    }

    /// Number of entries returned so far
    pub fn entries_read(&self) -> u64 {
        self.entries_read
    }

    fn read_entry(&mut self) -> Result<Option<Entry>> {
        if self.eof {
            return Ok(None);
        }
        if self.remaining == Some(0) {
            self.eof = true;
            return Ok(None);
        }

        let mut started = false;

        let rlevel = match self.rlevels.as_mut() {
            Some(stream) => match stream.next_level()? {
                Some(level) => {
                    started = true;
                    check_level(level, self.rlevel_max, "repetition")?
                }
                None => return self.end_of_stream(started, StreamKind::Repetition),
            },
            None => 0,
        };

        let dlevel = match self.dlevels.as_mut() {
            Some(stream) => match stream.next_level()? {
                Some(level) => {
                    started = true;
                    check_level(level, self.dlevel_max, "definition")?
                }
                None => return self.end_of_stream(started, StreamKind::Definition),
            },
            None => self.dlevel_max,
        };

        let value = if dlevel == self.dlevel_max {
            match self.values.next_value()? {
                Some(value) => Some(value),
                None => return self.end_of_stream(started, StreamKind::Value),
            }
        } else {
            None
        };

        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        Ok(Some(Entry { rlevel, dlevel, value }))
    }

    /// A stream ran dry. Without a stored entry count, the first stream of an
    /// entry running dry is the end of the column, provided every stream read
    /// after it is dry too; anything else is truncation.
    fn end_of_stream(&mut self, started: bool, dry: StreamKind) -> Result<Option<Entry>> {
        if self.remaining.is_some() || started {
            return Err(Error::corruption(format!(
                "{} stream ended before the last entry",
                dry.name()
            )));
        }

        if dry == StreamKind::Repetition {
            if let Some(stream) = self.dlevels.as_mut() {
                if stream.next_level()?.is_some() {
                    return Err(trailing_data(dry, StreamKind::Definition));
                }
            }
        }
        if dry != StreamKind::Value && self.values.next_value()?.is_some() {
            return Err(trailing_data(dry, StreamKind::Value));
        }

        self.eof = true;
        Ok(None)
    }
}

impl Iterator for ColumnCursor<'_> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}

fn check_level(level: u64, max: u32, kind: &str) -> Result<u32> {
    if level > max as u64 {
        return Err(Error::corruption(format!(
            "{} level {} exceeds column maximum {}",
            kind, level, max
        )));
    }
    Ok(level as u32)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamKind {
    Repetition,
    Definition,
    Value,
}

impl StreamKind {
    fn name(self) -> &'static str {
        match self {
            StreamKind::Repetition => "repetition level",
            StreamKind::Definition => "definition level",
            StreamKind::Value => "value",
        }
    }
}

fn trailing_data(dry: StreamKind, trailing: StreamKind) -> Error {
    Error::corruption(format!(
        "{} stream ended while the {} stream still holds data",
        dry.name(),
        trailing.name()
    ))
}
