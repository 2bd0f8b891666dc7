//! Fixed-width bit-packing, least significant bit first.

use crate::codec::Decoder;
use crate::error::{Error, Result};

/// Largest supported bit width.
pub const MAX_BIT_WIDTH: u8 = 32;

/// Number of bits needed to store every value in `0..=max`.
pub fn bits_required(max: u32) -> u8 {
    (32 - max.leading_zeros()) as u8
}

/// Decodes unsigned integers packed at a fixed bit width.
///
/// A width of 0 decodes an endless run of zeros; callers bound the number of
/// values they read. Trailing bits that do not form a whole value are padding.
#[derive(Debug, Clone)]
pub struct BitPackedDecoder<'a> {
    data: &'a [u8],
    width: u8,
    bit_pos: usize,
}

impl<'a> BitPackedDecoder<'a> {
    /// Create a decoder over `data` with the given bit width
    pub fn new(data: &'a [u8], width: u8) -> Result<Self> {
        if width > MAX_BIT_WIDTH {
            return Err(Error::corruption(format!("invalid bit width: {}", width)));
        }
        Ok(Self { data, width, bit_pos: 0 })
    }

    /// Create a decoder whose first byte carries the bit width
    pub fn with_width_prefix(data: &'a [u8]) -> Result<Self> {
        match data.split_first() {
            Some((&width, rest)) => Self::new(rest, width),
            None => Err(Error::corruption("bit-packed stream is missing its width byte")),
        }
    }

    /// The bit width
    pub fn width(&self) -> u8 {
        self.width
    }

    fn remaining_bits(&self) -> usize {
        self.data.len() * 8 - self.bit_pos
    }
}

impl Decoder for BitPackedDecoder<'_> {
    type Item = u32;

    fn next_value(&mut self) -> Result<Option<u32>> {
        let width = self.width as usize;
        if width == 0 {
            return Ok(Some(0));
        }
        if self.remaining_bits() < width {
            return Ok(None);
        }

        let mut value: u64 = 0;
        let mut read = 0;
        while read < width {
            let byte = self.data[self.bit_pos / 8] as u64;
            let shift = self.bit_pos % 8;
            let take = (8 - shift).min(width - read);
            let bits = (byte >> shift) & ((1u64 << take) - 1);
            value |= bits << read;
            read += take;
            self.bit_pos += take;
        }

        Ok(Some(value as u32))
    }

    fn position(&self) -> usize {
        self.bit_pos.div_ceil(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pack(values: &[u32], width: u8) -> Vec<u8> {
        let mut out = vec![0u8; (values.len() * width as usize).div_ceil(8)];
        let mut bit = 0usize;
        for &v in values {
            for i in 0..width as usize {
                if (v >> i) & 1 == 1 {
                    out[bit / 8] |= 1 << (bit % 8);
                }
                bit += 1;
            }
        }
        out
    }

    #[test]
    fn test_bits_required() {
        assert_eq!(bits_required(0), 0);
        assert_eq!(bits_required(1), 1);
        assert_eq!(bits_required(2), 2);
        assert_eq!(bits_required(3), 2);
        assert_eq!(bits_required(255), 8);
        assert_eq!(bits_required(u32::MAX), 32);
    }

    #[test]
    fn test_decode_booleans() {
        // 0b0000_0101: true, false, true, then padding
        let data = [0b0000_0101u8];
        let mut dec = BitPackedDecoder::new(&data, 1).unwrap();
        assert_eq!(dec.next_value().unwrap(), Some(1));
        assert_eq!(dec.next_value().unwrap(), Some(0));
        assert_eq!(dec.next_value().unwrap(), Some(1));
        assert_eq!(dec.position(), 1);
    }

    #[test]
    fn test_width_prefix() {
        let mut data = vec![3u8];
        data.extend(pack(&[5, 1, 7], 3));
        let mut dec = BitPackedDecoder::with_width_prefix(&data).unwrap();
        assert_eq!(dec.width(), 3);
        assert_eq!(dec.next_value().unwrap(), Some(5));
        assert_eq!(dec.next_value().unwrap(), Some(1));
        assert_eq!(dec.next_value().unwrap(), Some(7));

        assert!(BitPackedDecoder::with_width_prefix(&[]).is_err());
        assert!(BitPackedDecoder::with_width_prefix(&[33]).is_err());
    }

    #[test]
    fn test_zero_width_yields_zeros() {
        let mut dec = BitPackedDecoder::new(&[], 0).unwrap();
        for _ in 0..4 {
            assert_eq!(dec.next_value().unwrap(), Some(0));
        }
    }

    #[test]
    fn test_exhausted_stream() {
        let data = pack(&[1, 2], 7);
        let mut dec = BitPackedDecoder::new(&data, 7).unwrap();
        assert_eq!(dec.next_value().unwrap(), Some(1));
        assert_eq!(dec.next_value().unwrap(), Some(2));
        assert_eq!(dec.next_value().unwrap(), None);
    }

    proptest! {
        #[test]
        fn prop_decodes_packed_values(values in prop::collection::vec(any::<u32>(), 0..64), width in 1u8..=32) {
            let mask = if width == 32 { u32::MAX } else { (1u32 << width) - 1 };
            let values: Vec<u32> = values.into_iter().map(|v| v & mask).collect();
            let data = pack(&values, width);

            let mut dec = BitPackedDecoder::new(&data, width).unwrap();
            for &expected in &values {
                prop_assert_eq!(dec.next_value().unwrap(), Some(expected));
            }
        }
    }
}
