//! Client for the wiremq binary messaging protocol.
//!
//! wiremq speaks a lightweight MQTT-style framing over message-oriented
//! duplex links such as WebSockets: one header byte, a multi-byte remaining
//! length, an optional 16-bit message identifier and the payload.
//!
//! # Crate Structure
//!
//! - [`transport`]: link abstraction, in-memory and WebSocket connectors
//! - [`frame`]: wire codec, UTF-8 transcoder, payloads, reassembly
//! - [`client`]: connection engine with keepalive and failover (behind `client` feature)

/// Re-export transport types.
pub mod transport {
    pub use wiremq_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use wiremq_frame::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use wiremq_client::*;
}
