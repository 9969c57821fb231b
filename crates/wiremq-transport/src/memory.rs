use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{Connector, LinkId, Transport};

#[derive(Debug, Default)]
struct MemoryState {
    opened: Vec<(LinkId, String)>,
    written: Vec<(LinkId, Bytes)>,
    closed: Vec<LinkId>,
    refuse_next: Option<String>,
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process connector that records everything written to it.
///
/// Links never produce events on their own; whoever drives the engine feeds
/// [`TransportEvent`](crate::TransportEvent)s for them explicitly. A memory
/// link accepts writes from the moment it is created until it is closed.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryConnector {
    /// Create a connector and the handle observing it.
    pub fn new() -> (Self, MemoryHandle) {
        let connector = Self::default();
        let handle = MemoryHandle {
            state: Arc::clone(&connector.state),
        };
        (connector, handle)
    }
}

impl Connector for MemoryConnector {
    type Transport = MemoryTransport;

    fn open(&mut self, uri: &str, link: LinkId) -> Result<MemoryTransport> {
        let mut state = lock(&self.state);
        if let Some(reason) = state.refuse_next.take() {
            return Err(TransportError::Open {
                uri: uri.to_string(),
                reason,
            });
        }
        debug!(%uri, %link, "opening memory link");
        state.opened.push((link, uri.to_string()));
        Ok(MemoryTransport {
            link,
            closed: false,
            state: Arc::clone(&self.state),
        })
    }
}

/// One in-memory link.
#[derive(Debug)]
pub struct MemoryTransport {
    link: LinkId,
    closed: bool,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTransport {
    /// The link this transport was opened for.
    pub fn link(&self) -> LinkId {
        self.link
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, frame: Bytes) -> Result<()> {
        if self.closed {
            return Err(TransportError::NotOpen);
        }
        lock(&self.state).written.push((self.link, frame));
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            lock(&self.state).closed.push(self.link);
        }
    }

    fn is_open(&self) -> bool {
        !self.closed
    }
}

/// Observer side of a [`MemoryConnector`].
#[derive(Debug, Clone)]
pub struct MemoryHandle {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryHandle {
    /// Every link opened so far, in order, with the uri it was opened for.
    pub fn opened(&self) -> Vec<(LinkId, String)> {
        lock(&self.state).opened.clone()
    }

    /// Uris opened so far, in order.
    pub fn opened_uris(&self) -> Vec<String> {
        lock(&self.state)
            .opened
            .iter()
            .map(|(_, uri)| uri.clone())
            .collect()
    }

    /// The most recently opened link.
    pub fn last_link(&self) -> Option<LinkId> {
        lock(&self.state).opened.last().map(|(link, _)| *link)
    }

    /// Buffers written on `link`, in write order.
    pub fn written(&self, link: LinkId) -> Vec<Bytes> {
        lock(&self.state)
            .written
            .iter()
            .filter(|(id, _)| *id == link)
            .map(|(_, frame)| frame.clone())
            .collect()
    }

    /// Drain every buffer written so far, across all links.
    pub fn take_written(&self) -> Vec<(LinkId, Bytes)> {
        std::mem::take(&mut lock(&self.state).written)
    }

    /// Links closed by their owner, in close order.
    pub fn closed(&self) -> Vec<LinkId> {
        lock(&self.state).closed.clone()
    }

    /// Make the next `open` call fail synchronously with `reason`.
    pub fn refuse_next_open(&self, reason: impl Into<String>) {
        lock(&self.state).refuse_next = Some(reason.into());
    }
}
