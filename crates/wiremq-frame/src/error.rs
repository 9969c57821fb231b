/// Errors that can occur during frame encoding/decoding and text transcoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// A byte sequence is not valid UTF-8. Carries the offending bytes.
    #[error("malformed UTF-8 data: {}", crate::utf8::bytes_to_hex(.bytes))]
    MalformedUtf { bytes: Vec<u8> },

    /// A UTF-16 sequence holds an unpaired surrogate, or decoding produced a
    /// value that is not a Unicode scalar. `next` is the unit that followed.
    #[error("malformed Unicode string: {unit:#06x} {}", unit_or_end(.next))]
    MalformedUnicode { unit: u32, next: Option<u16> },

    /// A value was rejected while constructing a payload.
    #[error("invalid argument {value} for {name}")]
    InvalidArgument { value: String, name: &'static str },

    /// The remaining length does not fit in four MBI digits.
    #[error("remaining length too large ({size} bytes, max {max})")]
    LengthTooLarge { size: usize, max: usize },

    /// The declared remaining length (identifier plus payload) exceeds the
    /// configured maximum.
    #[error("frame too large (remaining length {size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// A remaining-length field did not terminate within four digits.
    #[error("malformed remaining length: no terminating digit within 4 bytes")]
    MalformedLength,

    /// An identified frame is too short to hold its message identifier.
    #[error("frame type {frame_type} declares {remaining} remaining bytes, too few for a message identifier")]
    MissingIdentifier { frame_type: u8, remaining: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;

fn unit_or_end(unit: &Option<u16>) -> String {
    match unit {
        Some(unit) => format!("{unit:#06x}"),
        None => "<end>".to_string(),
    }
}
