//! Multi-byte integer (MBI) codec for the remaining-length field.
//!
//! Seven value bits per digit, least significant digit first, high bit set
//! on every digit except the last. At most four digits.

use bytes::BufMut;

use crate::error::{FrameError, Result};

/// Largest value four MBI digits can carry.
pub const MAX_VALUE: usize = 268_435_455;

/// Maximum number of digits in an MBI field.
pub const MAX_DIGITS: usize = 4;

const CONTINUATION: u8 = 0x80;

/// Number of digits `value` encodes to.
pub fn encoded_len(value: usize) -> usize {
    match value {
        0..=127 => 1,
        128..=16_383 => 2,
        16_384..=2_097_151 => 3,
        _ => 4,
    }
}

/// Append the MBI encoding of `value` to `dst`, returning the digit count.
pub fn encode(value: usize, dst: &mut impl BufMut) -> Result<usize> {
    if value > MAX_VALUE {
        return Err(FrameError::LengthTooLarge {
            size: value,
            max: MAX_VALUE,
        });
    }

    let mut remaining = value;
    let mut written = 0;
    loop {
        let mut digit = (remaining % 128) as u8;
        remaining >>= 7;
        if remaining > 0 {
            digit |= CONTINUATION;
        }
        dst.put_u8(digit);
        written += 1;
        if remaining == 0 {
            return Ok(written);
        }
    }
}

/// Decode an MBI field starting at `offset`.
///
/// Returns `Ok(None)` when `buf` ends before the terminating digit, and
/// otherwise the value together with the offset just past the field.
pub fn decode(buf: &[u8], offset: usize) -> Result<Option<(usize, usize)>> {
    let mut value = 0usize;
    let mut multiplier = 1usize;
    let mut pos = offset;

    for _ in 0..MAX_DIGITS {
        let Some(&digit) = buf.get(pos) else {
            return Ok(None);
        };
        pos += 1;
        value += usize::from(digit & !CONTINUATION) * multiplier;
        if digit & CONTINUATION == 0 {
            return Ok(Some((value, pos)));
        }
        multiplier *= 128;
    }

    Err(FrameError::MalformedLength)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(value: usize) -> Vec<u8> {
        let mut out = Vec::new();
        encode(value, &mut out).unwrap();
        out
    }

    #[test]
    fn digit_boundaries() {
        assert_eq!(encoded(0), vec![0x00]);
        assert_eq!(encoded(127), vec![0x7f]);
        assert_eq!(encoded(128), vec![0x80, 0x01]);
        assert_eq!(encoded(16_383), vec![0xff, 0x7f]);
        assert_eq!(encoded(16_384), vec![0x80, 0x80, 0x01]);
        assert_eq!(encoded(2_097_151), vec![0xff, 0xff, 0x7f]);
        assert_eq!(encoded(2_097_152), vec![0x80, 0x80, 0x80, 0x01]);
        assert_eq!(encoded(MAX_VALUE), vec![0xff, 0xff, 0xff, 0x7f]);
    }

    #[test]
    fn roundtrip_and_length_agree() {
        for value in [0, 1, 127, 128, 321, 16_383, 16_384, 65_535, 2_097_151, 2_097_152, MAX_VALUE] {
            let bytes = encoded(value);
            assert_eq!(bytes.len(), encoded_len(value), "{value}");
            assert!(bytes.len() <= MAX_DIGITS);
            assert_eq!(decode(&bytes, 0).unwrap(), Some((value, bytes.len())));
        }
    }

    #[test]
    fn rejects_values_over_four_digits() {
        let mut out = Vec::new();
        let err = encode(MAX_VALUE + 1, &mut out).unwrap_err();
        assert!(matches!(err, FrameError::LengthTooLarge { .. }));
        assert!(out.is_empty());
    }

    #[test]
    fn truncated_field_is_incomplete() {
        assert_eq!(decode(&[0x80, 0x80], 0).unwrap(), None);
        assert_eq!(decode(&[], 0).unwrap(), None);
        assert_eq!(decode(&[0x05], 1).unwrap(), None);
    }

    #[test]
    fn decodes_at_offset() {
        let buf = [0x40, 0xc1, 0x02, 0xaa];
        assert_eq!(decode(&buf, 1).unwrap(), Some((321, 3)));
    }

    #[test]
    fn unterminated_field_is_malformed() {
        let err = decode(&[0x80, 0x80, 0x80, 0x80, 0x01], 0).unwrap_err();
        assert_eq!(err, FrameError::MalformedLength);
    }
}
