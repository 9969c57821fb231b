//! UTF-8 transcoding and hex helpers.
//!
//! Text crosses the wire as UTF-8. The encoder also accepts UTF-16 code
//! units so that surrogate pairs coming from a UTF-16 source are validated
//! and folded into 4-byte sequences; the decoder rejects every continuation
//! byte outside `0x80..=0xBF`, every truncated sequence, and lead bytes that
//! cannot start a sequence, reporting the offending bytes.

use std::fmt::Write as _;

use bytes::BufMut;

use crate::error::{FrameError, Result};

const HIGH_SURROGATES: std::ops::RangeInclusive<u16> = 0xD800..=0xDBFF;
const LOW_SURROGATES: std::ops::RangeInclusive<u16> = 0xDC00..=0xDFFF;

/// Encoded UTF-8 length of `text`, computed without allocating.
pub fn text_byte_length(text: &str) -> usize {
    units_byte_length(text.encode_utf16())
}

/// Encoded UTF-8 length of a UTF-16 sequence.
///
/// A high surrogate counts for a whole 4-byte sequence together with the
/// unit after it. Validation is left to [`encode_utf16`].
pub fn utf16_byte_length(units: &[u16]) -> usize {
    units_byte_length(units.iter().copied())
}

fn units_byte_length(mut units: impl Iterator<Item = u16>) -> usize {
    let mut total = 0;
    while let Some(unit) = units.next() {
        total += match unit {
            0x0000..=0x007F => 1,
            0x0080..=0x07FF => 2,
            unit if HIGH_SURROGATES.contains(&unit) => {
                units.next();
                4
            }
            _ => 3,
        };
    }
    total
}

/// Append the UTF-8 encoding of `text` to `dst`.
pub fn encode_str(text: &str, dst: &mut impl BufMut) {
    for ch in text.chars() {
        put_code_point(u32::from(ch), dst);
    }
}

/// Append the UTF-8 encoding of a UTF-16 sequence to `dst`.
///
/// Surrogate pairs become one 4-byte sequence. A high surrogate that is not
/// followed by a low surrogate, or a low surrogate on its own, fails with
/// [`FrameError::MalformedUnicode`]; bytes for the units before it have
/// already been appended at that point.
pub fn encode_utf16(units: &[u16], dst: &mut impl BufMut) -> Result<()> {
    let mut i = 0;
    while i < units.len() {
        let unit = units[i];
        i += 1;

        let code_point = if HIGH_SURROGATES.contains(&unit) {
            let next = units.get(i).copied();
            match next {
                Some(low) if LOW_SURROGATES.contains(&low) => {
                    i += 1;
                    0x10000 + ((u32::from(unit) - 0xD800) << 10) + (u32::from(low) - 0xDC00)
                }
                _ => {
                    return Err(FrameError::MalformedUnicode {
                        unit: u32::from(unit),
                        next,
                    })
                }
            }
        } else if LOW_SURROGATES.contains(&unit) {
            return Err(FrameError::MalformedUnicode {
                unit: u32::from(unit),
                next: units.get(i).copied(),
            });
        } else {
            u32::from(unit)
        };

        put_code_point(code_point, dst);
    }
    Ok(())
}

fn put_code_point(code_point: u32, dst: &mut impl BufMut) {
    // Every shifted value is masked to its bit width first, so the casts never truncate.
    if code_point <= 0x7F {
        dst.put_u8(code_point as u8);
    } else if code_point <= 0x7FF {
        dst.put_u8(0xC0 | ((code_point >> 6) & 0x1F) as u8);
        dst.put_u8(0x80 | (code_point & 0x3F) as u8);
    } else if code_point <= 0xFFFF {
        dst.put_u8(0xE0 | ((code_point >> 12) & 0x0F) as u8);
        dst.put_u8(0x80 | ((code_point >> 6) & 0x3F) as u8);
        dst.put_u8(0x80 | (code_point & 0x3F) as u8);
    } else {
        dst.put_u8(0xF0 | ((code_point >> 18) & 0x07) as u8);
        dst.put_u8(0x80 | ((code_point >> 12) & 0x3F) as u8);
        dst.put_u8(0x80 | ((code_point >> 6) & 0x3F) as u8);
        dst.put_u8(0x80 | (code_point & 0x3F) as u8);
    }
}

/// Decode `length` UTF-8 bytes starting at `offset` into a `String`.
pub fn decode(bytes: &[u8], offset: usize, length: usize) -> Result<String> {
    let window = window(bytes, offset, length)?;
    let mut out = String::with_capacity(window.len());
    let mut pos = 0;
    while pos < window.len() {
        let code_point = next_code_point(window, &mut pos)?;
        out.push(scalar(code_point)?);
    }
    Ok(out)
}

/// Decode `length` UTF-8 bytes starting at `offset` into UTF-16 code units.
///
/// Code points above the basic multilingual plane come back as surrogate pairs.
pub fn decode_utf16(bytes: &[u8], offset: usize, length: usize) -> Result<Vec<u16>> {
    let window = window(bytes, offset, length)?;
    let mut out = Vec::with_capacity(window.len());
    let mut pos = 0;
    while pos < window.len() {
        let code_point = u32::from(scalar(next_code_point(window, &mut pos)?)?);
        if code_point > 0xFFFF {
            let folded = code_point - 0x10000;
            out.push(0xD800 + (folded >> 10) as u16);
            out.push(0xDC00 + (folded & 0x3FF) as u16);
        } else {
            out.push(code_point as u16);
        }
    }
    Ok(out)
}

fn window(bytes: &[u8], offset: usize, length: usize) -> Result<&[u8]> {
    offset
        .checked_add(length)
        .and_then(|end| bytes.get(offset..end))
        .ok_or_else(|| FrameError::InvalidArgument {
            value: format!("{offset}+{length} of {}", bytes.len()),
            name: "utf8 range",
        })
}

fn scalar(code_point: u32) -> Result<char> {
    char::from_u32(code_point).ok_or(FrameError::MalformedUnicode {
        unit: code_point,
        next: None,
    })
}

fn next_code_point(bytes: &[u8], pos: &mut usize) -> Result<u32> {
    let start = *pos;
    let lead = bytes[start];
    *pos += 1;

    let (continuation, mut code_point) = match lead {
        0x00..=0x7F => return Ok(u32::from(lead)),
        0xC0..=0xDF => (1, u32::from(lead & 0x1F)),
        0xE0..=0xEF => (2, u32::from(lead & 0x0F)),
        0xF0..=0xF7 => (3, u32::from(lead & 0x07)),
        _ => {
            return Err(FrameError::MalformedUtf { bytes: vec![lead] });
        }
    };

    for _ in 0..continuation {
        let Some(&byte) = bytes.get(*pos) else {
            return Err(FrameError::MalformedUtf {
                bytes: bytes[start..].to_vec(),
            });
        };
        if !(0x80..=0xBF).contains(&byte) {
            return Err(FrameError::MalformedUtf {
                bytes: bytes[start..=*pos].to_vec(),
            });
        }
        code_point = (code_point << 6) | u32::from(byte & 0x3F);
        *pos += 1;
    }

    Ok(code_point)
}

/// Render bytes as space-separated lowercase hex pairs, e.g. `"20 00"`.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Parse hex pairs back into bytes. Whitespace between digits is ignored.
pub fn hex_to_bytes(hex: &str) -> Result<Vec<u8>> {
    let digits: Vec<u8> = hex.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err(FrameError::InvalidArgument {
            value: hex.to_string(),
            name: "hex (odd number of digits)",
        });
    }

    digits
        .chunks_exact(2)
        .map(|pair| match (hex_digit(pair[0]), hex_digit(pair[1])) {
            (Some(high), Some(low)) => Ok((high << 4) | low),
            _ => Err(FrameError::InvalidArgument {
                value: hex.to_string(),
                name: "hex",
            }),
        })
        .collect()
}

fn hex_digit(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}
