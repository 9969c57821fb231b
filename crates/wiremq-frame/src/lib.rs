//! Wire codec for the wiremq protocol.
//!
//! Every frame on the wire is laid out as:
//! - A 1-byte header: frame type in the upper nibble, protocol version below
//! - The remaining length as a 1-4 byte multi-byte integer (MBI)
//! - A 2-byte big-endian message identifier, for types 4-11 only
//! - The payload, which is everything left
//!
//! Text payloads travel as UTF-8. The [`utf8`] module holds the strict
//! transcoder along with the hex helpers used for diagnostics.

pub mod assembler;
pub mod codec;
pub mod error;
pub mod frame_type;
pub mod mbi;
pub mod payload;
pub mod utf8;

pub use assembler::FrameAssembler;
pub use codec::{
    decode_frame, decode_frame_with_limit, encode_frame, Frame, FrameConfig, DEFAULT_MAX_REMAINING_LENGTH,
    PROTOCOL_VERSION,
};
pub use error::{FrameError, Result};
pub use frame_type::FrameType;
pub use payload::Payload;
