//! Frame type table.
//!
//! The type lives in the upper nibble of the header byte. Types 4-11 carry a
//! 16-bit message identifier; 0-3, 12 and 13 do not. 14 and 15 are unassigned.

use std::fmt;

/// The 4-bit type of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameType(u8);

impl FrameType {
    /// Authentication request (identity + access token).
    pub const CONNECT: Self = Self(0);
    /// Authentication acknowledgment.
    pub const CONNACK: Self = Self(1);
    /// Heartbeat request.
    pub const PINGREQ: Self = Self(2);
    /// Heartbeat reply.
    pub const PINGRESP: Self = Self(3);
    /// Request-class data message.
    pub const SEND: Self = Self(4);
    /// Reply to [`FrameType::SEND`].
    pub const SEND_REPLY: Self = Self(5);
    /// Action command.
    pub const ACTION: Self = Self(6);
    /// Reply to [`FrameType::ACTION`].
    pub const ACTION_REPLY: Self = Self(7);
    /// Device debug message.
    pub const DEV_DEBUG: Self = Self(8);
    /// Reply to [`FrameType::DEV_DEBUG`].
    pub const DEV_DEBUG_REPLY: Self = Self(9);
    /// Metadata message.
    pub const SEND_META: Self = Self(10);
    /// Reply to [`FrameType::SEND_META`].
    pub const SEND_META_REPLY: Self = Self(11);
    /// Reserved, never sent.
    pub const RAW: Self = Self(12);
    /// Connection teardown.
    pub const DISCONNECT: Self = Self(13);

    /// Build a frame type from its nibble value. Only the low 4 bits are kept.
    pub const fn new(value: u8) -> Self {
        Self(value & 0x0F)
    }

    /// The nibble value.
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Whether frames of this type carry a message identifier.
    pub const fn is_identified(self) -> bool {
        self.0 >= Self::SEND.0 && self.0 <= Self::SEND_META_REPLY.0
    }

    /// Whether this type is in the assigned range 0-13.
    pub const fn is_known(self) -> bool {
        self.0 <= Self::DISCONNECT.0
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::CONNECT => "CONNECT",
            Self::CONNACK => "CONNACK",
            Self::PINGREQ => "PINGREQ",
            Self::PINGRESP => "PINGRESP",
            Self::SEND => "SEND",
            Self::SEND_REPLY => "SEND_REPLY",
            Self::ACTION => "ACTION",
            Self::ACTION_REPLY => "ACTION_REPLY",
            Self::DEV_DEBUG => "DEV_DEBUG",
            Self::DEV_DEBUG_REPLY => "DEV_DEBUG_REPLY",
            Self::SEND_META => "SEND_META",
            Self::SEND_META_REPLY => "SEND_META_REPLY",
            Self::RAW => "RAW",
            Self::DISCONNECT => "DISCONNECT",
            _ => "UNKNOWN",
        }
    }

    /// Look a type up by name, case-insensitively. Accepts `-` for `_`.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim().to_ascii_uppercase().replace('-', "_");
        (0..=Self::DISCONNECT.0)
            .map(Self)
            .find(|kind| kind.name() == wanted)
    }
}

impl From<u8> for FrameType {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}
