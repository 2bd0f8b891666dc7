//! Unsigned LEB128 varints.

use crate::codec::Decoder;
use crate::error::{Error, Result};

/// Longest valid encoding of a u64.
pub const MAX_VARINT_LEN: usize = 10;

/// Decode one varint from the front of `data`.
///
/// Returns the value and the number of bytes it occupied.
pub fn decode_u64(data: &[u8]) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    for (i, &byte) in data.iter().enumerate().take(MAX_VARINT_LEN) {
        let bits = (byte & 0x7f) as u64;
        if i == MAX_VARINT_LEN - 1 && bits > 1 {
            return Err(Error::corruption("LEB128 varint overflows u64"));
        }
        value |= bits << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }

    if data.len() >= MAX_VARINT_LEN {
        Err(Error::corruption("LEB128 varint longer than 10 bytes"))
    } else {
        Err(Error::corruption("truncated LEB128 varint"))
    }
}

/// Sequential LEB128 decoder.
#[derive(Debug, Clone)]
pub struct Leb128Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Leb128Decoder<'a> {
    /// Create a decoder over `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl Decoder for Leb128Decoder<'_> {
    type Item = u64;

    fn next_value(&mut self) -> Result<Option<u64>> {
        if self.pos >= self.data.len() {
            return Ok(None);
        }
        let (value, len) = decode_u64(&self.data[self.pos..])?;
        self.pos += len;
        Ok(Some(value))
    }

    fn position(&self) -> usize {
        self.pos
    }
}
