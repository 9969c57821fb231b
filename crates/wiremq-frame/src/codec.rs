use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::frame_type::FrameType;
use crate::mbi;
use crate::payload::Payload;

/// Protocol version carried in the low bits of the header byte.
pub const PROTOCOL_VERSION: u8 = 0;

/// Default maximum remaining length accepted when decoding: the MBI limit.
pub const DEFAULT_MAX_REMAINING_LENGTH: usize = mbi::MAX_VALUE;

const IDENTIFIER_SIZE: usize = 2;

/// One protocol frame.
///
/// Equality treats an empty payload and an absent payload as the same body,
/// since both encode to zero payload bytes.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Frame type from the header's upper nibble.
    pub kind: FrameType,
    /// Correlation identifier; written only when present.
    pub message_identifier: Option<u16>,
    /// Body after the identifier. Zero-length bodies decode as `None`.
    pub payload: Option<Payload>,
}

impl Frame {
    /// A frame with neither identifier nor payload.
    pub fn new(kind: FrameType) -> Self {
        Self {
            kind,
            message_identifier: None,
            payload: None,
        }
    }

    /// Attach a message identifier.
    pub fn with_identifier(mut self, message_identifier: u16) -> Self {
        self.message_identifier = Some(message_identifier);
        self
    }

    /// Attach a payload.
    pub fn with_payload(mut self, payload: impl Into<Payload>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Declared remaining length: identifier (if any) plus payload bytes.
    pub fn remaining_length(&self) -> usize {
        let identifier = if self.message_identifier.is_some() {
            IDENTIFIER_SIZE
        } else {
            0
        };
        identifier + self.payload.as_ref().map_or(0, Payload::byte_len)
    }

    /// Total encoded size: header, length field, and body.
    pub fn wire_size(&self) -> usize {
        let remaining = self.remaining_length();
        1 + mbi::encoded_len(remaining) + remaining
    }

    /// Payload bytes, if any; an empty payload counts as none.
    pub fn body(&self) -> Option<&Payload> {
        self.payload.as_ref().filter(|payload| !payload.is_empty())
    }

    /// Encode into a fresh buffer.
    pub fn encode(&self) -> Result<Bytes> {
        let mut dst = BytesMut::with_capacity(self.wire_size());
        encode_frame(self, &mut dst)?;
        Ok(dst.freeze())
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.message_identifier == other.message_identifier
            && self.body() == other.body()
    }
}

impl Eq for Frame {}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────────┬────────────────┬────────────────────┬──────────────┐
/// │ Header (1B)      │ Remaining len  │ Message id         │ Payload       │
/// │ type<<4 | version│ (MBI, 1-4B)    │ (2B BE, optional)  │ (rest)        │
/// └──────────────────┴────────────────┴────────────────────┴──────────────┘
/// ```
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    let remaining = frame.remaining_length();
    if remaining > mbi::MAX_VALUE {
        return Err(FrameError::LengthTooLarge {
            size: remaining,
            max: mbi::MAX_VALUE,
        });
    }

    dst.reserve(frame.wire_size());
    dst.put_u8((frame.kind.value() << 4) | (PROTOCOL_VERSION & 0x03));
    mbi::encode(remaining, dst)?;
    if let Some(identifier) = frame.message_identifier {
        dst.put_u16(identifier);
    }
    if let Some(payload) = &frame.payload {
        dst.put_slice(&payload.as_bytes());
    }
    Ok(())
}

/// Decode one frame starting at `offset`.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet; the
/// caller keeps its offset and retries once more bytes have arrived. On
/// success returns the frame and the offset just past it.
pub fn decode_frame(buf: &[u8], offset: usize) -> Result<Option<(Frame, usize)>> {
    decode_frame_with_limit(buf, offset, DEFAULT_MAX_REMAINING_LENGTH)
}

/// [`decode_frame`] with an explicit cap on the declared remaining length.
pub fn decode_frame_with_limit(
    buf: &[u8],
    offset: usize,
    max_remaining: usize,
) -> Result<Option<(Frame, usize)>> {
    let Some(&header) = buf.get(offset) else {
        return Ok(None); // Need more data
    };
    let kind = FrameType::new(header >> 4);

    let Some((remaining, body_start)) = mbi::decode(buf, offset + 1)? else {
        return Ok(None); // Need more data
    };

    if remaining > max_remaining {
        return Err(FrameError::FrameTooLarge {
            size: remaining,
            max: max_remaining,
        });
    }

    let end = body_start + remaining;
    if end > buf.len() {
        return Ok(None); // Need more data
    }

    let mut pos = body_start;
    let message_identifier = if kind.is_identified() {
        if remaining < IDENTIFIER_SIZE {
            return Err(FrameError::MissingIdentifier {
                frame_type: kind.value(),
                remaining,
            });
        }
        let identifier = u16::from_be_bytes([buf[pos], buf[pos + 1]]);
        pos += IDENTIFIER_SIZE;
        Some(identifier)
    } else {
        None
    };

    let payload = (pos < end).then(|| Payload::Bytes(Bytes::copy_from_slice(&buf[pos..end])));

    Ok(Some((
        Frame {
            kind,
            message_identifier,
            payload,
        },
        end,
    )))
}

/// Configuration for inbound frame reassembly.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum declared remaining length in bytes, counting the message
    /// identifier as well as the payload. Default: the MBI limit.
    pub max_remaining_length: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_remaining_length: DEFAULT_MAX_REMAINING_LENGTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let frame = Frame::new(FrameType::SEND)
            .with_identifier(0x1234)
            .with_payload("hello, wiremq!");

        let wire = frame.encode().unwrap();
        assert_eq!(wire.len(), frame.wire_size());
        assert_eq!(wire[0], 0x40);
        assert_eq!(wire[1] as usize, 2 + 14);
        assert_eq!(&wire[2..4], &[0x12, 0x34]);

        let (decoded, next) = decode_frame(&wire, 0).unwrap().unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(next, wire.len());
    }

    #[test]
    fn test_empty_payload_roundtrips() {
        let frames = [
            Frame::new(FrameType::SEND).with_identifier(1).with_payload(""),
            Frame::new(FrameType::ACTION).with_identifier(2).with_payload(Vec::<u8>::new()),
            Frame::new(FrameType::RAW).with_payload(""),
        ];
        for frame in frames {
            let wire = frame.encode().unwrap();
            let (decoded, next) = decode_frame(&wire, 0).unwrap().unwrap();
            assert_eq!(next, wire.len());
            assert_eq!(decoded, frame);
            assert!(decoded.body().is_none());
        }

        assert_ne!(
            Frame::new(FrameType::SEND).with_identifier(1).with_payload(""),
            Frame::new(FrameType::SEND).with_identifier(1).with_payload("x")
        );
    }

    #[test]
    fn test_unidentified_frames_have_no_identifier() {
        for kind in [FrameType::CONNECT, FrameType::CONNACK, FrameType::PINGRESP, FrameType::DISCONNECT] {
            let frame = Frame::new(kind).with_payload(vec![1u8, 2, 3]);
            let wire = frame.encode().unwrap();
            assert_eq!(wire[1], 3);

            let (decoded, _) = decode_frame(&wire, 0).unwrap().unwrap();
            assert_eq!(decoded.kind, kind);
            assert_eq!(decoded.message_identifier, None);
            assert_eq!(decoded, frame);
        }
    }

    #[test]
    fn test_pingreq_is_two_bytes() {
        let wire = Frame::new(FrameType::PINGREQ).encode().unwrap();
        assert_eq!(wire.as_ref(), &[0x20, 0x00]);

        let (decoded, next) = decode_frame(&wire, 0).unwrap().unwrap();
        assert_eq!(decoded, Frame::new(FrameType::PINGREQ));
        assert_eq!(next, 2);
    }

    #[test]
    fn test_every_type_roundtrips_through_header() {
        for value in 0..16u8 {
            let kind = FrameType::new(value);
            let mut frame = Frame::new(kind).with_payload("x");
            if kind.is_identified() {
                frame = frame.with_identifier(u16::from(value));
            }
            let wire = frame.encode().unwrap();
            let (decoded, _) = decode_frame(&wire, 0).unwrap().unwrap();
            assert_eq!(decoded.kind.value(), value);
            assert_eq!(decoded, frame);
        }
    }

    #[test]
    fn test_decode_incomplete_header() {
        assert!(decode_frame(&[], 0).unwrap().is_none());
        assert!(decode_frame(&[0x40], 0).unwrap().is_none());
        assert!(decode_frame(&[0x40, 0x80], 0).unwrap().is_none());
    }

    #[test]
    fn test_decode_incomplete_payload() {
        let wire = Frame::new(FrameType::ACTION)
            .with_identifier(7)
            .with_payload("hello")
            .encode()
            .unwrap();

        for cut in 0..wire.len() {
            assert!(decode_frame(&wire[..cut], 0).unwrap().is_none(), "cut at {cut}");
        }
    }

    #[test]
    fn test_multiple_frames_at_offsets() {
        let mut buf = BytesMut::new();
        encode_frame(&Frame::new(FrameType::SEND).with_identifier(1).with_payload("first"), &mut buf).unwrap();
        encode_frame(&Frame::new(FrameType::PINGRESP), &mut buf).unwrap();
        encode_frame(&Frame::new(FrameType::SEND_REPLY).with_identifier(1).with_payload("second"), &mut buf).unwrap();

        let (f1, next) = decode_frame(&buf, 0).unwrap().unwrap();
        assert_eq!(f1.payload.unwrap().as_text().unwrap(), "first");
        let (f2, next) = decode_frame(&buf, next).unwrap().unwrap();
        assert_eq!(f2.kind, FrameType::PINGRESP);
        let (f3, next) = decode_frame(&buf, next).unwrap().unwrap();
        assert_eq!(f3.kind, FrameType::SEND_REPLY);
        assert_eq!(f3.message_identifier, Some(1));
        assert_eq!(next, buf.len());
        assert!(decode_frame(&buf, next).unwrap().is_none());
    }

    #[test]
    fn test_large_payload_uses_multi_byte_length() {
        let payload = vec![0xAB; 70_000];
        let frame = Frame::new(FrameType::DEV_DEBUG)
            .with_identifier(9)
            .with_payload(payload.clone());
        let wire = frame.encode().unwrap();
        assert_eq!(wire.len(), 1 + 3 + 2 + payload.len());

        let (decoded, _) = decode_frame(&wire, 0).unwrap().unwrap();
        assert_eq!(decoded.payload.unwrap().as_bytes().as_ref(), payload.as_slice());
    }

    #[test]
    fn test_decode_payload_too_large() {
        let wire = [0x40, 0xff, 0xff, 0x7f];
        let result = decode_frame_with_limit(&wire, 0, 1024);
        assert!(matches!(result, Err(FrameError::FrameTooLarge { .. })));
    }

    #[test]
    fn test_identified_frame_shorter_than_identifier() {
        let result = decode_frame(&[0x40, 0x01, 0x00], 0);
        assert!(matches!(
            result,
            Err(FrameError::MissingIdentifier {
                frame_type: 4,
                remaining: 1
            })
        ));
    }

    #[test]
    fn test_identifier_zero_roundtrips() {
        let frame = Frame::new(FrameType::ACTION_REPLY).with_identifier(0);
        let wire = frame.encode().unwrap();
        assert_eq!(wire.as_ref(), &[0x70, 0x02, 0x00, 0x00]);
        let (decoded, _) = decode_frame(&wire, 0).unwrap().unwrap();
        assert_eq!(decoded, frame);
    }
}
