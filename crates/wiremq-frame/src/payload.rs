use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;

use crate::error::Result;
use crate::utf8;

/// Immutable frame payload holding either text or raw bytes.
///
/// Either view can be requested regardless of which form was stored; the
/// other one is transcoded on demand and the stored form never changes.
/// Two payloads are equal when their byte views are equal.
#[derive(Clone)]
pub enum Payload {
    Text(String),
    Bytes(Bytes),
}

impl Payload {
    /// A text payload.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// A raw byte payload.
    pub fn bytes(bytes: impl Into<Bytes>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// A text payload from UTF-16 code units. Unpaired surrogates are rejected.
    pub fn from_utf16(units: &[u16]) -> Result<Self> {
        let mut encoded = Vec::with_capacity(utf8::utf16_byte_length(units));
        utf8::encode_utf16(units, &mut encoded)?;
        let text = utf8::decode(&encoded, 0, encoded.len())?;
        Ok(Self::Text(text))
    }

    /// A byte payload parsed from hex pairs.
    pub fn from_hex(hex: &str) -> Result<Self> {
        Ok(Self::Bytes(Bytes::from(utf8::hex_to_bytes(hex)?)))
    }

    /// The text view. Byte payloads are decoded as UTF-8.
    pub fn as_text(&self) -> Result<Cow<'_, str>> {
        match self {
            Self::Text(text) => Ok(Cow::Borrowed(text.as_str())),
            Self::Bytes(bytes) => utf8::decode(bytes, 0, bytes.len()).map(Cow::Owned),
        }
    }

    /// The byte view. Text payloads are encoded as UTF-8.
    pub fn as_bytes(&self) -> Cow<'_, [u8]> {
        match self {
            Self::Text(text) => {
                let mut encoded = Vec::with_capacity(utf8::text_byte_length(text));
                utf8::encode_str(text, &mut encoded);
                Cow::Owned(encoded)
            }
            Self::Bytes(bytes) => Cow::Borrowed(&bytes[..]),
        }
    }

    /// The byte view as `Bytes`, without copying stored bytes.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Self::Text(_) => Bytes::from(self.as_bytes().into_owned()),
            Self::Bytes(bytes) => bytes.clone(),
        }
    }

    /// Length of the byte view.
    pub fn byte_len(&self) -> usize {
        match self {
            Self::Text(text) => utf8::text_byte_length(text),
            Self::Bytes(bytes) => bytes.len(),
        }
    }

    /// Whether the byte view is empty.
    pub fn is_empty(&self) -> bool {
        self.byte_len() == 0
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => self.as_bytes() == other.as_bytes(),
        }
    }
}

impl Eq for Payload {}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(Bytes::copy_from_slice(bytes))
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Bytes(bytes) => f
                .debug_tuple("Bytes")
                .field(&format_args!("[{}]", utf8::bytes_to_hex(bytes)))
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::FrameError;

    use super::*;

    #[test]
    fn text_exposes_both_views() {
        let payload = Payload::text("温度");
        assert_eq!(payload.as_text().unwrap(), "温度");
        assert_eq!(payload.as_bytes().as_ref(), "温度".as_bytes());
        assert_eq!(payload.byte_len(), 6);
        assert!(matches!(payload, Payload::Text(_)));
    }

    #[test]
    fn bytes_expose_both_views() {
        let payload = Payload::bytes(Bytes::from_static(b"{\"id\":1}"));
        assert_eq!(payload.as_text().unwrap(), "{\"id\":1}");
        assert_eq!(payload.as_bytes().as_ref(), b"{\"id\":1}");
        assert!(matches!(payload, Payload::Bytes(_)));
    }

    #[test]
    fn invalid_utf8_bytes_fail_text_view() {
        let payload = Payload::from(vec![0xC3, 0x28]);
        assert!(matches!(
            payload.as_text(),
            Err(FrameError::MalformedUtf { .. })
        ));
        assert_eq!(payload.as_bytes().as_ref(), &[0xC3, 0x28]);
    }

    #[test]
    fn equality_compares_byte_views() {
        assert_eq!(Payload::text("abc"), Payload::from(&b"abc"[..]));
        assert_ne!(Payload::text("abc"), Payload::text("abd"));
    }

    #[test]
    fn from_utf16_rejects_unpaired_surrogate() {
        let units: Vec<u16> = "ok😀".encode_utf16().collect();
        assert_eq!(Payload::from_utf16(&units).unwrap(), Payload::text("ok😀"));

        let err = Payload::from_utf16(&[0x6f, 0xD83D]).unwrap_err();
        assert!(matches!(err, FrameError::MalformedUnicode { unit: 0xD83D, .. }));
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert_eq!(
            Payload::from_hex("de ad").unwrap().as_bytes().as_ref(),
            &[0xde, 0xad]
        );
        assert!(matches!(
            Payload::from_hex("xyz"),
            Err(FrameError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn debug_renders_bytes_as_hex() {
        let payload = Payload::from(vec![0x01, 0xff]);
        assert_eq!(format!("{payload:?}"), "Bytes([01 ff])");
    }
}
