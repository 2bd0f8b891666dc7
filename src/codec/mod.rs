//! Value codecs.
//!
//! Each codec decodes a bounded byte range sequentially. They share one
//! contract, [`Decoder`]: `Ok(Some(v))` for the next value, `Ok(None)` once
//! the range is cleanly exhausted, and `Err(Corruption)` when the range ends
//! in the middle of a value.

pub mod bitpacked;
pub mod leb128;
pub mod plain;

pub use bitpacked::{bits_required, BitPackedDecoder};
pub use leb128::Leb128Decoder;
pub use plain::{FixedWidthDecoder, StringDecoder};

use crate::error::Result;

/// Sequential decoder over a bounded byte range.
pub trait Decoder {
    /// The decoded value type.
    type Item;

    /// Decode the next value.
    fn next_value(&mut self) -> Result<Option<Self::Item>>;

    /// Number of bytes consumed so far.
    fn position(&self) -> usize;
}
