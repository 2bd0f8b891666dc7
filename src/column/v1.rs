//! v0.1.0 columns: one contiguous body per column, decoded in place.
//!
//! Body format:
//! ```text
//! [num_entries: u64]
//! [rlevel_size: u64]
//! [dlevel_size: u64]
//! [rlevels: rlevel_size bytes]   // bit-packed, width = bits(rlevel_max)
//! [dlevels: dlevel_size bytes]   // bit-packed, width = bits(dlevel_max)
//! [values: rest of body]         // encoding-specific
//! ```

use crate::codec::{bits_required, BitPackedDecoder, FixedWidthDecoder, Leb128Decoder, StringDecoder};
use crate::column::{ColumnCursor, LevelStream, ValueStream};
use crate::error::{Error, Result};
use crate::format::{ColumnConfig, ColumnEncoding, V1_BODY_HEADER_SIZE};
use bytes::Buf;
use memmap2::Mmap;
use std::ops::Range;
use std::sync::Arc;

/// Value decoders for v0.1.0 columns, one per storage encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum V1Decoder {
    /// `BooleanBitPacked`
    Boolean,
    /// `UInt32BitPacked`
    BitPackedInt,
    /// `UInt32Plain`
    UInt32,
    /// `UInt64Plain`
    UInt64,
    /// `UInt64Leb128`
    Leb128,
    /// `FloatIeee754`
    Double,
    /// `StringPlain`
    String,
}

impl V1Decoder {
    /// The decoder for a storage encoding
    pub fn for_encoding(encoding: ColumnEncoding) -> Self {
        match encoding {
            ColumnEncoding::BooleanBitPacked => V1Decoder::Boolean,
            ColumnEncoding::UInt32BitPacked => V1Decoder::BitPackedInt,
            ColumnEncoding::UInt32Plain => V1Decoder::UInt32,
            ColumnEncoding::UInt64Plain => V1Decoder::UInt64,
            ColumnEncoding::UInt64Leb128 => V1Decoder::Leb128,
            ColumnEncoding::FloatIeee754 => V1Decoder::Double,
            ColumnEncoding::StringPlain => V1Decoder::String,
        }
    }
}

/// A v0.1.0 column reading straight out of the shared memory map.
#[derive(Debug)]
pub struct MappedColumnReader {
    config: ColumnConfig,
    decoder: V1Decoder,
    mmap: Arc<Mmap>,
    num_entries: u64,
    rlevels: Range<usize>,
    dlevels: Range<usize>,
    values: Range<usize>,
}

impl MappedColumnReader {
    /// Bind a column to its body in the mapping.
    ///
    /// Validates the body bounds and its fixed prefix; no I/O happens here or
    /// later, everything is read from the mapping.
    pub fn new(config: ColumnConfig, decoder: V1Decoder, mmap: Arc<Mmap>) -> Result<Self> {
        let body = body_range(&config, mmap.len())?;
        if body.len() < V1_BODY_HEADER_SIZE {
            return Err(Error::corruption(format!(
                "column {}: body of {} bytes is smaller than its header",
                config.column_name,
                body.len()
            )));
        }

        let mut header = &mmap[body.start..body.start + V1_BODY_HEADER_SIZE];
        let num_entries = header.get_u64_le();
        let rlevel_size = header.get_u64_le();
        let dlevel_size = header.get_u64_le();

        let rlevel_start = body.start + V1_BODY_HEADER_SIZE;
        let rlevel_end = offset_within(rlevel_start, rlevel_size, body.end, &config)?;
        let dlevel_end = offset_within(rlevel_end, dlevel_size, body.end, &config)?;

        let capacity = entry_capacity(
            &config,
            decoder,
            rlevel_end - rlevel_start,
            dlevel_end - rlevel_end,
            &mmap[dlevel_end..body.end],
        );
        match capacity {
            Some(capacity) if num_entries > capacity => {
                return Err(Error::corruption(format!(
                    "column {}: {} entries claimed, body holds at most {}",
                    config.column_name, num_entries, capacity
                )));
            }
            None if num_entries > 0 => {
                return Err(Error::corruption(format!(
                    "column {}: {} entries of zero bit width with no levels to bound them",
                    config.column_name, num_entries
                )));
            }
            _ => {}
        }

        Ok(Self {
            decoder,
            num_entries,
            rlevels: rlevel_start..rlevel_end,
            dlevels: rlevel_end..dlevel_end,
            values: dlevel_end..body.end,
            config,
            mmap,
        })
    }

    /// The column's metadata
    pub fn config(&self) -> &ColumnConfig {
        &self.config
    }

    /// The value decoder in use
    pub fn decoder(&self) -> V1Decoder {
        self.decoder
    }

    /// Number of entries (values and nulls) stored in the body
    pub fn num_entries(&self) -> u64 {
        self.num_entries
    }

    pub(crate) fn cursor(&self) -> Result<ColumnCursor<'_>> {
        let rlevels = match self.config.rlevel_max {
            0 => None,
            max => Some(LevelStream::Packed(BitPackedDecoder::new(
                &self.mmap[self.rlevels.clone()],
                bits_required(max),
            )?)),
        };
        let dlevels = match self.config.dlevel_max {
            0 => None,
            max => Some(LevelStream::Packed(BitPackedDecoder::new(
                &self.mmap[self.dlevels.clone()],
                bits_required(max),
            )?)),
        };

        let data = &self.mmap[self.values.clone()];
        let values = match self.decoder {
            V1Decoder::Boolean => ValueStream::Boolean(BitPackedDecoder::new(data, 1)?),
            V1Decoder::BitPackedInt if data.is_empty() => {
                ValueStream::BitPackedInt(BitPackedDecoder::new(data, 1)?)
            }
            V1Decoder::BitPackedInt => {
                ValueStream::BitPackedInt(BitPackedDecoder::with_width_prefix(data)?)
            }
            V1Decoder::UInt32 => ValueStream::UInt32(FixedWidthDecoder::new(data)),
            V1Decoder::UInt64 => ValueStream::UInt64(FixedWidthDecoder::new(data)),
            V1Decoder::Leb128 => ValueStream::Leb128(Leb128Decoder::new(data)),
            V1Decoder::Double => ValueStream::Double(FixedWidthDecoder::new(data)),
            V1Decoder::String => ValueStream::String(StringDecoder::new(data)),
        };

        Ok(ColumnCursor::new(&self.config, rlevels, dlevels, values, Some(self.num_entries)))
    }
}

fn body_range(config: &ColumnConfig, mapped_len: usize) -> Result<Range<usize>> {
    let out_of_bounds = || {
        Error::corruption(format!(
            "column {}: body at {} ({} bytes) lies outside the file ({} bytes)",
            config.column_name, config.body_offset, config.body_size, mapped_len
        ))
    };

    let end = config.body_end().ok_or_else(out_of_bounds)?;
    if end > mapped_len as u64 {
        return Err(out_of_bounds());
    }
    Ok(config.body_offset as usize..end as usize)
}

/// Upper bound on the entries a body can hold: every entry takes one slot
/// in each level stream, and one value unless the column has definition
/// levels. `None` when nothing bounds it (zero-width values, no levels).
fn entry_capacity(
    config: &ColumnConfig,
    decoder: V1Decoder,
    rlevel_len: usize,
    dlevel_len: usize,
    values: &[u8],
) -> Option<u64> {
    let bits = |len: usize| len as u64 * 8;
    let mut capacity: Option<u64> = None;
    let mut bound = |limit: u64| {
        capacity = Some(capacity.map_or(limit, |c| c.min(limit)));
    };

    if config.rlevel_max > 0 {
        bound(bits(rlevel_len) / bits_required(config.rlevel_max) as u64);
    }
    if config.dlevel_max > 0 {
        bound(bits(dlevel_len) / bits_required(config.dlevel_max) as u64);
    } else {
        let value_bits = match decoder {
            V1Decoder::Boolean => Some(1),
            V1Decoder::BitPackedInt => match values.split_first() {
                Some((&0, _)) => None,
                Some((&width, rest)) => {
                    bound(bits(rest.len()) / width as u64);
                    None
                }
                None => Some(1),
            },
            V1Decoder::Leb128 => Some(8),
            V1Decoder::UInt32 | V1Decoder::String => Some(32),
            V1Decoder::UInt64 | V1Decoder::Double => Some(64),
        };
        if let Some(value_bits) = value_bits {
            bound(bits(values.len()) / value_bits);
        }
    }

    capacity
}

fn offset_within(start: usize, len: u64, end: usize, config: &ColumnConfig) -> Result<usize> {
    usize::try_from(len)
        .ok()
        .and_then(|len| start.checked_add(len))
        .filter(|&next| next <= end)
        .ok_or_else(|| {
            Error::corruption(format!(
                "column {}: level stream of {} bytes overruns the column body",
                config.column_name, len
            ))
        })
}
