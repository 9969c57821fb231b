use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Result, TransportError};
use crate::traits::{Connector, LinkId, Transport, TransportEvent};

/// Sending half of the shared link event channel.
pub type EventSender = mpsc::UnboundedSender<(LinkId, TransportEvent)>;
/// Receiving half of the shared link event channel.
pub type EventReceiver = mpsc::UnboundedReceiver<(LinkId, TransportEvent)>;

/// Opens WebSocket links, one tokio task per link.
///
/// All links report into the same event channel, tagged with their [`LinkId`].
/// Binary messages are forwarded as-is; text messages are ignored and
/// WebSocket-level pings are answered by tungstenite itself.
#[derive(Debug, Clone)]
pub struct WsConnector {
    events: EventSender,
}

impl WsConnector {
    /// Create a connector and the receiver its links report into.
    pub fn new() -> (Self, EventReceiver) {
        let (events, rx) = mpsc::unbounded_channel();
        (Self { events }, rx)
    }

    /// Create a connector reporting into an existing channel.
    pub fn with_sender(events: EventSender) -> Self {
        Self { events }
    }
}

impl Connector for WsConnector {
    type Transport = WsTransport;

    fn open(&mut self, uri: &str, link: LinkId) -> Result<WsTransport> {
        // Built without a TLS backend: only plain WebSocket links.
        if uri.starts_with("wss://") {
            return Err(TransportError::Unsupported("TLS (wss://)".to_string()));
        }
        if !uri.starts_with("ws://") {
            return Err(TransportError::InvalidUri {
                uri: uri.to_string(),
                reason: "expected a ws:// address".to_string(),
            });
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| TransportError::Unsupported("tokio runtime".to_string()))?;

        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(false));
        let cancel = CancellationToken::new();

        runtime.spawn(run_link(
            uri.to_string(),
            link,
            outgoing_rx,
            self.events.clone(),
            Arc::clone(&open),
            cancel.clone(),
        ));

        Ok(WsTransport {
            link,
            outgoing: outgoing_tx,
            open,
            cancel,
        })
    }
}

/// Handle to one WebSocket link.
///
/// Writes are handed to the link task and go out in call order. Dropping
/// the handle closes the link.
#[derive(Debug)]
pub struct WsTransport {
    link: LinkId,
    outgoing: mpsc::UnboundedSender<Bytes>,
    open: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl WsTransport {
    /// The link this transport was opened for.
    pub fn link(&self) -> LinkId {
        self.link
    }
}

impl Transport for WsTransport {
    fn send(&mut self, frame: Bytes) -> Result<()> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        self.outgoing
            .send(frame)
            .map_err(|_| TransportError::Send("link task has stopped".to_string()))
    }

    fn close(&mut self) {
        self.open.store(false, Ordering::SeqCst);
        self.cancel.cancel();
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst) && !self.cancel.is_cancelled()
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_link(
    uri: String,
    link: LinkId,
    mut outgoing: mpsc::UnboundedReceiver<Bytes>,
    events: EventSender,
    open: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    let connected = tokio::select! {
        _ = cancel.cancelled() => return,
        result = connect_async(uri.as_str()) => result,
    };

    let (stream, _response) = match connected {
        Ok(pair) => pair,
        Err(err) => {
            warn!(%uri, %link, error = %err, "websocket connect failed");
            let _ = events.send((link, TransportEvent::Error(err.to_string())));
            return;
        }
    };

    open.store(true, Ordering::SeqCst);
    debug!(%uri, %link, "websocket link open");
    if events.send((link, TransportEvent::Opened)).is_err() {
        return;
    }

    let (mut sink, mut source) = stream.split();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sink.close().await;
                debug!(%link, "websocket link closed locally");
                break;
            }
            Some(frame) = outgoing.recv() => {
                if let Err(err) = sink.send(Message::Binary(frame)).await {
                    let _ = events.send((link, TransportEvent::Error(err.to_string())));
                    break;
                }
            }
            incoming = source.next() => match incoming {
                Some(Ok(Message::Binary(data))) => {
                    if events.send((link, TransportEvent::Message(data))).is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    debug!(%link, "websocket link closed by peer");
                    let _ = events.send((link, TransportEvent::Closed));
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    let _ = events.send((link, TransportEvent::Error(err.to_string())));
                    break;
                }
            },
        }
    }

    open.store(false, Ordering::SeqCst);
}
