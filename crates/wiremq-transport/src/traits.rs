use std::fmt;

use bytes::Bytes;

use crate::error::Result;

/// Identifies one attempt to open a transport link.
///
/// Every call to [`Connector::open`] gets a fresh id. Events carrying an id
/// that no longer matches the engine's current link belong to a link that
/// has already been torn down and are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkId(u64);

impl LinkId {
    /// Wrap a raw link number.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw link number.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The id following this one.
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link-{}", self.0)
    }
}

/// Something that happened on a link, reported asynchronously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The link is open and accepts writes.
    Opened,
    /// One transport-level message arrived. It may hold a partial protocol
    /// frame, exactly one frame, or several coalesced frames.
    Message(Bytes),
    /// The link failed.
    Error(String),
    /// The link was closed by the peer or the network.
    Closed,
}

/// An open (or opening) duplex, message-framed link.
pub trait Transport {
    /// Write one protocol buffer as a single transport message.
    fn send(&mut self, frame: Bytes) -> Result<()>;

    /// Close the link. Closing an already closed link is a no-op.
    fn close(&mut self);

    /// Whether the link has opened and has not been closed since.
    fn is_open(&self) -> bool;
}

/// Opens links to endpoint addresses.
pub trait Connector {
    type Transport: Transport;

    /// Start opening a link to `uri`.
    ///
    /// Must not block: the returned handle may still be connecting, and the
    /// outcome is reported later as [`TransportEvent::Opened`],
    /// [`TransportEvent::Error`] or [`TransportEvent::Closed`] tagged with `link`.
    fn open(&mut self, uri: &str, link: LinkId) -> Result<Self::Transport>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, frame: Bytes) -> Result<()> {
        (**self).send(frame)
    }

    fn close(&mut self) {
        (**self).close();
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}
