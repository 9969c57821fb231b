//! Message-framed duplex transport abstraction.
//!
//! The protocol engine never talks to a socket directly. It opens links
//! through a [`Connector`], writes whole protocol buffers through a
//! [`Transport`], and is fed [`TransportEvent`]s tagged with the [`LinkId`]
//! of the link they belong to.
//!
//! Implementations shipped here:
//! - [`MemoryConnector`]: in-process recorder, for tests and loopback use
//! - [`WsConnector`]: WebSocket links over tokio (behind the `async` feature)

pub mod error;
pub mod memory;
pub mod traits;

#[cfg(feature = "async")]
pub mod ws;

pub use error::{Result, TransportError};
pub use memory::{MemoryConnector, MemoryHandle, MemoryTransport};
pub use traits::{Connector, LinkId, Transport, TransportEvent};

#[cfg(feature = "async")]
pub use ws::{WsConnector, WsTransport};
