use std::fmt;

use wiremq_frame::Frame;

use crate::error::DisconnectReason;

/// Receipt for a confirmed send, echoed back by [`ClientEvent::MessageDelivered`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeliveryToken(u64);

impl DeliveryToken {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeliveryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "delivery-{}", self.0)
    }
}

/// Something the application should react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// CONNACK received; queued frames have been flushed.
    Connected { invocation_context: Option<String> },
    /// Every endpoint failed before a CONNACK. The engine is already retrying
    /// from the first endpoint unless the failure was a local disconnect.
    ConnectFailed {
        invocation_context: Option<String>,
        reason: DisconnectReason,
    },
    /// An established connection ended and no endpoint was left to fail over to.
    ConnectionLost { reason: DisconnectReason },
    /// A data, reply or notification frame arrived.
    MessageArrived(Frame),
    /// A confirmed send was written to the transport.
    MessageDelivered(DeliveryToken),
}
