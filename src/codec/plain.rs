//! Plain little-endian fixed-width values and length-prefixed strings.

use crate::codec::Decoder;
use crate::error::{Error, Result};
use std::marker::PhantomData;

/// A value stored as a fixed number of little-endian bytes.
pub trait FixedWidth: Sized {
    /// Encoded width in bytes.
    const WIDTH: usize;

    /// Decode from exactly `WIDTH` bytes.
    fn from_le_slice(data: &[u8]) -> Self;
}

impl FixedWidth for u32 {
    const WIDTH: usize = 4;

    fn from_le_slice(data: &[u8]) -> Self {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(data);
        u32::from_le_bytes(buf)
    }
}

impl FixedWidth for u64 {
    const WIDTH: usize = 8;

    fn from_le_slice(data: &[u8]) -> Self {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(data);
        u64::from_le_bytes(buf)
    }
}

impl FixedWidth for f64 {
    const WIDTH: usize = 8;

    fn from_le_slice(data: &[u8]) -> Self {
        f64::from_bits(u64::from_le_slice(data))
    }
}

/// Decodes a run of fixed-width values.
#[derive(Debug, Clone)]
pub struct FixedWidthDecoder<'a, T> {
    data: &'a [u8],
    pos: usize,
    _marker: PhantomData<T>,
}

impl<'a, T: FixedWidth> FixedWidthDecoder<'a, T> {
    /// Create a decoder over `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, _marker: PhantomData }
    }
}

impl<T: FixedWidth> Decoder for FixedWidthDecoder<'_, T> {
    type Item = T;

    fn next_value(&mut self) -> Result<Option<T>> {
        let remaining = self.data.len() - self.pos;
        if remaining == 0 {
            return Ok(None);
        }
        if remaining < T::WIDTH {
            return Err(Error::corruption(format!(
                "truncated value: {} of {} bytes",
                remaining,
                T::WIDTH
            )));
        }
        let value = T::from_le_slice(&self.data[self.pos..self.pos + T::WIDTH]);
        self.pos += T::WIDTH;
        Ok(Some(value))
    }

    fn position(&self) -> usize {
        self.pos
    }
}

/// Decodes `[len: u32][bytes]` UTF-8 strings.
#[derive(Debug, Clone)]
pub struct StringDecoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> StringDecoder<'a> {
    /// Create a decoder over `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Decode the next string without copying it
    pub fn next_str(&mut self) -> Result<Option<&'a str>> {
        let mut lengths = FixedWidthDecoder::<u32>::new(&self.data[self.pos..]);
        let len = match lengths.next_value()? {
            Some(len) => len as usize,
            None => return Ok(None),
        };

        let start = self.pos + 4;
        let end = start
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| Error::corruption("string runs past the end of its column"))?;

        let s = std::str::from_utf8(&self.data[start..end])
            .map_err(|_| Error::corruption("string value is not valid UTF-8"))?;
        self.pos = end;
        Ok(Some(s))
    }
}

impl Decoder for StringDecoder<'_> {
    type Item = String;

    fn next_value(&mut self) -> Result<Option<String>> {
        Ok(self.next_str()?.map(str::to_owned))
    }

    fn position(&self) -> usize {
        self.pos
    }
}
