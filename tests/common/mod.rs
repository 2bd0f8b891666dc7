// Shared fixture writer for the integration tests and benches.
// The crate itself only reads tables; everything that produces one lives here.

#![allow(dead_code)]

use bytes::BufMut;
use cstable::codec::bits_required;
use cstable::format::{PageRef, MAGIC_BYTES, METABLOCK_SIZE};
use cstable::page::PageIndexEntryType;
use cstable::{ColumnEncoding, ColumnType, ColumnValue};
use std::io::Write;
use tempfile::NamedTempFile;

pub const COMPRESSION_NONE: u8 = 0;
pub const COMPRESSION_SNAPPY: u8 = 1;
pub const COMPRESSION_LZ4: u8 = 2;

pub fn init_logging() {
    env_logger::builder().is_test(true).try_init().ok();
}

/// A column to be written, with its level and value streams.
#[derive(Debug, Clone)]
pub struct TestColumn {
    pub name: String,
    pub column_id: u32,
    pub storage: ColumnEncoding,
    pub logical: ColumnType,
    pub rlevel_max: u32,
    pub dlevel_max: u32,
    pub rlevels: Vec<u32>,
    pub dlevels: Vec<u32>,
    pub values: Vec<ColumnValue>,
}

impl TestColumn {
    pub fn new(name: &str, storage: ColumnEncoding, logical: ColumnType, values: Vec<ColumnValue>) -> Self {
        Self {
            name: name.to_string(),
            column_id: 0,
            storage,
            logical,
            rlevel_max: 0,
            dlevel_max: 0,
            rlevels: Vec::new(),
            dlevels: Vec::new(),
            values,
        }
    }

    pub fn with_id(mut self, column_id: u32) -> Self {
        self.column_id = column_id;
        self
    }

    pub fn repeated(mut self, rlevel_max: u32, rlevels: Vec<u32>) -> Self {
        self.rlevel_max = rlevel_max;
        self.rlevels = rlevels;
        self
    }

    pub fn optional(mut self, dlevel_max: u32, dlevels: Vec<u32>) -> Self {
        self.dlevel_max = dlevel_max;
        self.dlevels = dlevels;
        self
    }

    pub fn num_entries(&self) -> usize {
        if self.dlevel_max > 0 {
            self.dlevels.len()
        } else if self.rlevel_max > 0 {
            self.rlevels.len()
        } else {
            self.values.len()
        }
    }
}

pub fn uints(values: &[u64]) -> Vec<ColumnValue> {
    values.iter().map(|&v| ColumnValue::UnsignedInt(v)).collect()
}

pub fn strings(values: &[&str]) -> Vec<ColumnValue> {
    values.iter().map(|v| ColumnValue::String(v.to_string())).collect()
}

pub fn write_file(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

fn pack_bits(values: impl IntoIterator<Item = u32>, width: u8) -> Vec<u8> {
    let mut out = Vec::new();
    let mut bit = 0usize;
    for v in values {
        for i in 0..width as usize {
            if bit / 8 == out.len() {
                out.push(0);
            }
            if (v >> i) & 1 == 1 {
                out[bit / 8] |= 1 << (bit % 8);
            }
            bit += 1;
        }
    }
    out
}

pub fn put_leb128(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.put_u8(byte);
            return;
        }
        buf.put_u8(byte | 0x80);
    }
}

fn put_column(buf: &mut Vec<u8>, col: &TestColumn) {
    buf.put_u32_le(col.storage.as_u32());
    buf.put_u32_le(col.logical.as_u32());
    buf.put_u32_le(col.column_id);
    buf.put_u16_le(col.name.len() as u16);
    buf.put_slice(col.name.as_bytes());
    buf.put_u32_le(col.rlevel_max);
    buf.put_u32_le(col.dlevel_max);
}

fn column_header_len(col: &TestColumn) -> usize {
    4 + 4 + 4 + 2 + col.name.len() + 4 + 4
}

// ---------------------------------------------------------------------------
// v0.1.0
// ---------------------------------------------------------------------------

fn v1_values(col: &TestColumn) -> Vec<u8> {
    let mut buf = Vec::new();
    match col.storage {
        ColumnEncoding::BooleanBitPacked => {
            buf = pack_bits(col.values.iter().map(|v| v.as_bool().unwrap() as u32), 1);
        }
        ColumnEncoding::UInt32BitPacked => {
            let ints: Vec<u32> = col.values.iter().map(|v| v.as_u64().unwrap() as u32).collect();
            let width = bits_required(ints.iter().copied().max().unwrap_or(0)).max(1);
            buf.put_u8(width);
            buf.extend(pack_bits(ints, width));
        }
        ColumnEncoding::UInt32Plain => {
            for v in &col.values {
                buf.put_u32_le(v.as_u64().unwrap() as u32);
            }
        }
        ColumnEncoding::UInt64Plain => {
            for v in &col.values {
                buf.put_u64_le(v.as_u64().unwrap());
            }
        }
        ColumnEncoding::UInt64Leb128 => {
            for v in &col.values {
                put_leb128(&mut buf, v.as_u64().unwrap());
            }
        }
        ColumnEncoding::FloatIeee754 => {
            for v in &col.values {
                buf.put_f64_le(v.as_f64().unwrap());
            }
        }
        ColumnEncoding::StringPlain => {
            for v in &col.values {
                let s = v.as_str().unwrap();
                buf.put_u32_le(s.len() as u32);
                buf.put_slice(s.as_bytes());
            }
        }
    }
    buf
}

pub fn v1_body(col: &TestColumn) -> Vec<u8> {
    let rlevels = match col.rlevel_max {
        0 => Vec::new(),
        max => pack_bits(col.rlevels.iter().copied(), bits_required(max)),
    };
    let dlevels = match col.dlevel_max {
        0 => Vec::new(),
        max => pack_bits(col.dlevels.iter().copied(), bits_required(max)),
    };

    let mut buf = Vec::new();
    buf.put_u64_le(col.num_entries() as u64);
    buf.put_u64_le(rlevels.len() as u64);
    buf.put_u64_le(dlevels.len() as u64);
    buf.extend(rlevels);
    buf.extend(dlevels);
    buf.extend(v1_values(col));
    buf
}

/// Serialize a v0.1.0 table: tag, header, then the column bodies in order.
pub fn v1_bytes(num_rows: u64, columns: &[TestColumn]) -> Vec<u8> {
    let bodies: Vec<Vec<u8>> = columns.iter().map(v1_body).collect();
    let header_len =
        6 + 8 + 8 + 4 + columns.iter().map(|c| column_header_len(c) + 16).sum::<usize>();

    let mut buf = Vec::new();
    buf.put_slice(&MAGIC_BYTES);
    buf.put_u16_le(1);
    buf.put_u64_le(0); // flags
    buf.put_u64_le(num_rows);
    buf.put_u32_le(columns.len() as u32);

    let mut offset = header_len as u64;
    for (col, body) in columns.iter().zip(&bodies) {
        put_column(&mut buf, col);
        buf.put_u64_le(offset);
        buf.put_u64_le(body.len() as u64);
        offset += body.len() as u64;
    }
    assert_eq!(buf.len(), header_len);

    for body in bodies {
        buf.extend(body);
    }
    buf
}

pub fn write_v1(num_rows: u64, columns: &[TestColumn]) -> NamedTempFile {
    write_file(&v1_bytes(num_rows, columns))
}

// ---------------------------------------------------------------------------
// v0.2.0
// ---------------------------------------------------------------------------

/// How a v0.2.0 table is cut into pages.
#[derive(Debug, Clone)]
pub struct PagedLayout {
    pub values_per_page: usize,
    pub compression: u8,
    /// Entries of the free-space index; `None` writes no free index at all
    pub free_pages: Option<Vec<PageRef>>,
}

impl Default for PagedLayout {
    fn default() -> Self {
        Self { values_per_page: 4, compression: COMPRESSION_NONE, free_pages: None }
    }
}

/// A serialized v0.2.0 table and where its pages landed.
#[derive(Debug, Clone)]
pub struct PagedTable {
    pub bytes: Vec<u8>,
    pub metablock_offset: usize,
    pub page_index: PageRef,
    pub free_index: Option<PageRef>,
    pub streams: Vec<(u32, PageIndexEntryType, Vec<PageRef>)>,
}

impl PagedTable {
    pub fn pages(&self, column_id: u32, entry_type: PageIndexEntryType) -> Vec<PageRef> {
        self.streams
            .iter()
            .find(|(id, ty, _)| *id == column_id && *ty == entry_type)
            .map(|(_, _, pages)| pages.clone())
            .unwrap_or_default()
    }

    pub fn write(&self) -> NamedTempFile {
        write_file(&self.bytes)
    }
}

fn compress(payload: &[u8], compression: u8) -> Vec<u8> {
    match compression {
        COMPRESSION_NONE => payload.to_vec(),
        #[cfg(feature = "snappy")]
        COMPRESSION_SNAPPY => snap::raw::Encoder::new().compress_vec(payload).unwrap(),
        #[cfg(feature = "lz4-compression")]
        COMPRESSION_LZ4 => lz4::block::compress(payload, None, true).unwrap(),
        other => panic!("compression {} is not available in this build", other),
    }
}

/// Append one page region and return its reference
pub fn put_page(buf: &mut Vec<u8>, payload: &[u8], compression: u8) -> PageRef {
    let stored = compress(payload, compression);
    let offset = buf.len() as u64;
    buf.put_slice(&stored);
    buf.put_u8(compression);
    buf.put_u32_le(crc32fast::hash(&stored));
    PageRef::new(offset, buf.len() as u64 - offset)
}

fn encode_uint(buf: &mut Vec<u8>, storage: ColumnEncoding, value: u64) {
    match storage {
        ColumnEncoding::UInt32Plain => buf.put_u32_le(value as u32),
        ColumnEncoding::UInt64Leb128 => put_leb128(buf, value),
        _ => buf.put_u64_le(value),
    }
}

fn put_stream(
    buf: &mut Vec<u8>,
    values: &[u64],
    storage: ColumnEncoding,
    layout: &PagedLayout,
) -> Vec<PageRef> {
    values
        .chunks(layout.values_per_page.max(1))
        .map(|chunk| {
            let mut payload = Vec::new();
            for &v in chunk {
                encode_uint(&mut payload, storage, v);
            }
            put_page(buf, &payload, layout.compression)
        })
        .collect()
}

/// Serialize a v0.2.0 table: tag, header, metablock, column pages, page
/// index and optional free index.
pub fn v2_table(num_rows: u64, columns: &[TestColumn], layout: &PagedLayout) -> PagedTable {
    let mut buf = Vec::new();
    buf.put_slice(&MAGIC_BYTES);
    buf.put_u16_le(2);
    buf.put_u64_le(0); // flags
    buf.put_u32_le(columns.len() as u32);
    for col in columns {
        put_column(&mut buf, col);
    }

    let metablock_offset = buf.len();
    buf.put_slice(&[0u8; METABLOCK_SIZE]);

    let mut streams = Vec::new();
    for col in columns {
        let values: Vec<u64> = col.values.iter().map(|v| v.as_u64().unwrap()).collect();
        let pages = put_stream(&mut buf, &values, col.storage, layout);
        streams.push((col.column_id, PageIndexEntryType::Value, pages));

        if col.rlevel_max > 0 {
            let levels: Vec<u64> = col.rlevels.iter().map(|&l| l as u64).collect();
            let pages = put_stream(&mut buf, &levels, ColumnEncoding::UInt64Plain, layout);
            streams.push((col.column_id, PageIndexEntryType::RLevel, pages));
        }
        if col.dlevel_max > 0 {
            let levels: Vec<u64> = col.dlevels.iter().map(|&l| l as u64).collect();
            let pages = put_stream(&mut buf, &levels, ColumnEncoding::UInt64Plain, layout);
            streams.push((col.column_id, PageIndexEntryType::DLevel, pages));
        }
    }

    let mut index = Vec::new();
    index.put_u32_le(streams.len() as u32);
    for (column_id, entry_type, pages) in &streams {
        index.put_u32_le(*column_id);
        index.put_u8(*entry_type as u8);
        index.put_u32_le(pages.len() as u32);
        for page in pages {
            index.put_slice(&page.encode());
        }
    }
    let page_index = put_page(&mut buf, &index, COMPRESSION_NONE);

    let free_index = layout.free_pages.as_ref().map(|free| {
        let mut payload = Vec::new();
        payload.put_u32_le(free.len() as u32);
        for page in free {
            payload.put_slice(&page.encode());
        }
        put_page(&mut buf, &payload, COMPRESSION_NONE)
    });

    let mut metablock = Vec::with_capacity(METABLOCK_SIZE);
    metablock.put_u64_le(num_rows);
    metablock.put_slice(&page_index.encode());
    metablock.put_slice(&free_index.unwrap_or(PageRef::new(0, 0)).encode());
    metablock.put_u32_le(crc32fast::hash(&metablock));
    buf[metablock_offset..metablock_offset + METABLOCK_SIZE].copy_from_slice(&metablock);

    PagedTable { bytes: buf, metablock_offset, page_index, free_index, streams }
}

pub fn write_v2(num_rows: u64, columns: &[TestColumn]) -> NamedTempFile {
    v2_table(num_rows, columns, &PagedLayout::default()).write()
}
