//! Connection engine for the wiremq protocol.
//!
//! [`Engine`] runs the client lifecycle over any [`Connector`]: authenticate
//! on open, queue and flush outbound frames, reassemble inbound deliveries,
//! ping on an interval, and fail over across an endpoint list. It is driven
//! explicitly with transport events and the current time, which keeps it
//! deterministic under test. With the `async` feature, [`runtime::Client`]
//! drives it on a tokio task over WebSocket links.
//!
//! [`Connector`]: wiremq_transport::Connector

pub mod credentials;
pub mod engine;
pub mod error;
pub mod event;
pub mod options;
#[cfg(feature = "async")]
pub mod runtime;
pub mod timer;

pub use credentials::Credentials;
pub use engine::{Engine, State};
pub use error::{ClientError, DisconnectReason, ErrorCode, Result};
pub use event::{ClientEvent, DeliveryToken};
pub use options::{
    ConnectOptions, DEFAULT_MAX_MESSAGE_IDENTIFIER, DEFAULT_OPEN_SETTLE_DELAY, DEFAULT_RETRY_DELAY,
};
#[cfg(feature = "async")]
pub use runtime::Client;
pub use timer::{
    ConnectTimer, KeepAlive, KeepAliveAction, DEFAULT_CONNECT_TIMEOUT, DEFAULT_KEEP_ALIVE_INTERVAL,
};
