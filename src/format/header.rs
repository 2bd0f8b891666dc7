//! Version tag, file header and metablock parsing.
//!
//! The header is read sequentially from the start of the file; nothing here
//! seeks. Every field width after the version tag depends on the version.

use crate::error::{Error, Result};
use crate::format::{
    BinaryFormatVersion, ColumnConfig, ColumnEncoding, ColumnType, PageRef, MAGIC_BYTES,
    METABLOCK_SIZE,
};
use bytes::Buf;
use std::io::{self, Read};

/// Column table and row count as declared in the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileHeader {
    /// Reserved flags
    pub flags: u64,
    /// Row count; authoritative for v0.1.0 only
    pub num_rows: u64,
    /// Columns in on-disk order
    pub columns: Vec<ColumnConfig>,
}

/// v0.2.0 metablock.
///
/// Format:
/// ```text
/// [num_rows: 8 bytes]
/// [page_index: 16 bytes]
/// [free_index: 16 bytes]   // size 0 = no free index
/// [checksum: 4 bytes]      // crc32 of the preceding 40 bytes
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaBlock {
    /// Authoritative row count
    pub num_rows: u64,
    /// Location of the page index page
    pub page_index: PageRef,
    /// Location of the free-space index page, if any
    pub free_index: Option<PageRef>,
}

impl MetaBlock {
    /// Decode a metablock from exactly [`METABLOCK_SIZE`] bytes
    pub fn decode(data: &[u8], verify_checksum: bool) -> Result<Self> {
        if data.len() != METABLOCK_SIZE {
            return Err(Error::corruption(format!(
                "MetaBlock size mismatch: expected {}, got {}",
                METABLOCK_SIZE,
                data.len()
            )));
        }

        let body = &data[..METABLOCK_SIZE - 4];
        let mut trailer = &data[METABLOCK_SIZE - 4..];
        let stored_checksum = trailer.get_u32_le();
        if verify_checksum {
            let computed_checksum = crc32fast::hash(body);
            if computed_checksum != stored_checksum {
                log::warn!(
                    "MetaBlock checksum mismatch: stored {:#x}, computed {:#x}",
                    stored_checksum,
                    computed_checksum
                );
                return Err(Error::ChecksumMismatch {
                    expected: stored_checksum,
                    actual: computed_checksum,
                });
            }
        }

        let mut buf = body;
        let num_rows = buf.get_u64_le();
        let page_index = PageRef::decode_from(&mut buf)?;
        let free_index = PageRef::decode_from(&mut buf)?;

        Ok(Self {
            num_rows,
            page_index,
            free_index: if free_index.is_empty() { None } else { Some(free_index) },
        })
    }
}

/// Everything parsed from the stream prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHeader {
    /// Binary format revision
    pub version: BinaryFormatVersion,
    /// Column table
    pub header: FileHeader,
    /// Present for v0.2.0 only
    pub metablock: Option<MetaBlock>,
}

impl TableHeader {
    /// The authoritative row count: metablock when present, header otherwise.
    pub fn num_rows(&self) -> u64 {
        match &self.metablock {
            Some(mb) => mb.num_rows,
            None => self.header.num_rows,
        }
    }
}

/// Sequential little-endian reads that turn a short stream into corruption.
struct StreamReader<'a, R: Read> {
    inner: &'a mut R,
    position: u64,
}

impl<'a, R: Read> StreamReader<'a, R> {
    fn new(inner: &'a mut R) -> Self {
        Self { inner, position: 0 }
    }

    fn read_exact(&mut self, buf: &mut [u8], what: &str) -> Result<()> {
        match self.inner.read_exact(buf) {
            Ok(()) => {
                self.position += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(Error::corruption(format!(
                "truncated header: stream ended reading {} at byte {}",
                what, self.position
            ))),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn read_u16(&mut self, what: &str) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf, what)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32(&mut self, what: &str) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf, what)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64(&mut self, what: &str) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf, what)?;
        Ok(u64::from_le_bytes(buf))
    }
}

/// Read the version tag, header and (v0.2.0) metablock from the start of a file.
pub fn read_header<R: Read>(reader: &mut R, verify_checksums: bool) -> Result<TableHeader> {
    let mut stream = StreamReader::new(reader);

    let mut magic = [0u8; 4];
    stream.read_exact(&mut magic, "magic bytes")?;
    if magic != MAGIC_BYTES {
        return Err(Error::corruption(format!(
            "Invalid cstable magic: expected {:?}, got {:?}",
            MAGIC_BYTES, magic
        )));
    }

    let version = BinaryFormatVersion::from_u16(stream.read_u16("version")?)?;

    let flags = stream.read_u64("flags")?;
    let num_rows = match version {
        BinaryFormatVersion::V0_1_0 => stream.read_u64("row count")?,
        BinaryFormatVersion::V0_2_0 => 0,
    };

    let num_columns = stream.read_u32("column count")?;
    let mut columns = Vec::new();
    for _ in 0..num_columns {
        columns.push(read_column(&mut stream, version)?);
    }

    let metablock = match version {
        BinaryFormatVersion::V0_1_0 => None,
        BinaryFormatVersion::V0_2_0 => {
            let mut buf = [0u8; METABLOCK_SIZE];
            stream.read_exact(&mut buf, "metablock")?;
            Some(MetaBlock::decode(&buf, verify_checksums)?)
        }
    };

    Ok(TableHeader { version, header: FileHeader { flags, num_rows, columns }, metablock })
}

fn read_column<R: Read>(
    stream: &mut StreamReader<'_, R>,
    version: BinaryFormatVersion,
) -> Result<ColumnConfig> {
    let storage_type = ColumnEncoding::from_u32(stream.read_u32("storage type")?)?;
    let logical_type = ColumnType::from_u32(stream.read_u32("logical type")?);
    let column_id = stream.read_u32("column id")?;

    let name_len = stream.read_u16("column name length")? as usize;
    if name_len == 0 {
        return Err(Error::corruption("empty column name"));
    }
    let mut name = vec![0u8; name_len];
    stream.read_exact(&mut name, "column name")?;
    let column_name = String::from_utf8(name)
        .map_err(|_| Error::corruption("column name is not valid UTF-8"))?;

    let rlevel_max = stream.read_u32("rlevel max")?;
    let dlevel_max = stream.read_u32("dlevel max")?;

    let (body_offset, body_size) = match version {
        BinaryFormatVersion::V0_1_0 => {
            (stream.read_u64("body offset")?, stream.read_u64("body size")?)
        }
        BinaryFormatVersion::V0_2_0 => (0, 0),
    };

    Ok(ColumnConfig {
        column_id,
        column_name,
        storage_type,
        logical_type,
        body_offset,
        body_size,
        rlevel_max,
        dlevel_max,
    })
}
