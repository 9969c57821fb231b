//! Connection engine: lifecycle state machine, outbound queue, inbound
//! reassembly, failover and the retry loop.
//!
//! The engine performs no I/O scheduling of its own. The owner feeds it
//! transport events with [`Engine::handle_transport`], calls
//! [`Engine::handle_timeout`] once [`Engine::poll_timeout`] is due, and drains
//! [`ClientEvent`]s with [`Engine::poll_event`]. Every call that can arm or
//! fire a timer takes the current time explicitly.

use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

use bytes::Bytes;
use tracing::{debug, info, trace, warn};
use wiremq_frame::{mbi, Frame, FrameAssembler, FrameConfig, FrameType, Payload, PROTOCOL_VERSION};
use wiremq_transport::{Connector, LinkId, Transport, TransportError, TransportEvent};

use crate::error::{ClientError, DisconnectReason, Result};
use crate::event::{ClientEvent, DeliveryToken};
use crate::options::ConnectOptions;
use crate::timer::{ConnectTimer, KeepAlive, KeepAliveAction};

const PING_REQUEST: [u8; 2] = [(FrameType::PINGREQ.value() << 4) | PROTOCOL_VERSION, 0];

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// No link and no attempt in progress.
    Idle,
    /// A link is opening or authenticating, or the retry loop is waiting.
    Connecting,
    /// CONNACK received.
    Connected,
    /// Teardown is running.
    Disconnecting,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
        };
        f.write_str(name)
    }
}

struct Link<T> {
    id: LinkId,
    uri: String,
    // None when the connector refused to open it.
    transport: Option<T>,
    opened: bool,
}

struct Outbound {
    frame: Frame,
    token: Option<DeliveryToken>,
}

/// Client protocol engine over a [`Connector`].
pub struct Engine<C: Connector> {
    connector: C,
    options: ConnectOptions,
    state: State,
    host_index: usize,
    link: Option<Link<C::Transport>>,
    last_link: LinkId,
    open_failure: Option<(Instant, String)>,
    settle_at: Option<Instant>,
    retry_at: Option<Instant>,
    connect_timer: ConnectTimer,
    keepalive: KeepAlive,
    queue: VecDeque<Outbound>,
    next_identifier: u32,
    next_token: u64,
    assembler: FrameAssembler,
    events: VecDeque<ClientEvent>,
}

impl<C: Connector> Engine<C> {
    /// Create an idle engine with default frame limits.
    pub fn new(connector: C) -> Self {
        Self::with_frame_config(connector, FrameConfig::default())
    }

    /// Create an idle engine with explicit inbound frame limits.
    pub fn with_frame_config(connector: C, frame_config: FrameConfig) -> Self {
        let options = ConnectOptions::default();
        Self {
            connector,
            connect_timer: ConnectTimer::new(options.timeout),
            keepalive: KeepAlive::new(options.keep_alive_interval),
            options,
            state: State::Idle,
            host_index: 0,
            link: None,
            last_link: LinkId::new(0),
            open_failure: None,
            settle_at: None,
            retry_at: None,
            queue: VecDeque::new(),
            next_identifier: 1,
            next_token: 0,
            assembler: FrameAssembler::with_config(frame_config),
            events: VecDeque::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == State::Connected
    }

    /// Options of the current or most recent `connect`.
    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }

    /// The current link, if one is open or opening.
    pub fn link(&self) -> Option<LinkId> {
        self.link.as_ref().map(|link| link.id)
    }

    /// Endpoint of the current link.
    pub fn current_uri(&self) -> Option<&str> {
        self.link.as_ref().map(|link| link.uri.as_str())
    }

    /// Position of the current endpoint in the failover list.
    pub fn host_index(&self) -> usize {
        self.host_index
    }

    /// Frames waiting for the connection to be established.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn connector_mut(&mut self) -> &mut C {
        &mut self.connector
    }

    /// Start connecting to the first endpoint in `options`.
    pub fn connect(&mut self, options: ConnectOptions, now: Instant) -> Result<()> {
        if self.state != State::Idle {
            return Err(ClientError::InvalidState {
                operation: "connect",
                state: self.state,
            });
        }
        options.validate()?;

        if self.next_identifier >= options.max_message_identifier {
            self.next_identifier = 1;
        }
        self.connect_timer = ConnectTimer::new(options.timeout);
        self.options = options;
        self.host_index = 0;
        info!(uris = ?self.options.uris, "connecting");
        self.open_link(now);
        Ok(())
    }

    /// Queue a frame of `kind`.
    ///
    /// SEND frames get the next message identifier; the other identified
    /// types go out with identifier 0. The frame is written immediately when
    /// connected, otherwise once CONNACK arrives.
    pub fn send(&mut self, kind: FrameType, payload: impl Into<Payload>, now: Instant) -> Result<()> {
        let frame = self.prepare("send", kind, payload.into())?;
        self.enqueue(frame, None, now);
        Ok(())
    }

    /// Like [`send`](Self::send), and report a [`ClientEvent::MessageDelivered`]
    /// right after the frame is written.
    pub fn send_confirmed(
        &mut self,
        kind: FrameType,
        payload: impl Into<Payload>,
        now: Instant,
    ) -> Result<DeliveryToken> {
        let frame = self.prepare("send", kind, payload.into())?;
        self.next_token += 1;
        let token = DeliveryToken::new(self.next_token);
        self.enqueue(frame, Some(token), now);
        Ok(token)
    }

    /// Queue a frame answering the request carrying `message_identifier`.
    pub fn reply(
        &mut self,
        kind: FrameType,
        message_identifier: u16,
        payload: impl Into<Payload>,
        now: Instant,
    ) -> Result<()> {
        self.check_sendable("reply", kind)?;
        let frame = Frame::new(kind)
            .with_identifier(message_identifier)
            .with_payload(payload);
        check_size(&frame)?;
        self.enqueue(frame, None, now);
        Ok(())
    }

    /// Tear the connection down locally.
    ///
    /// Terminal: no failover and no retry. Reports `ConnectionLost` if the
    /// connection was established and `ConnectFailed` otherwise.
    pub fn disconnect(&mut self) -> Result<()> {
        if self.state == State::Idle {
            return Err(ClientError::InvalidState {
                operation: "disconnect",
                state: self.state,
            });
        }

        let was_connected = self.state == State::Connected;
        info!(uri = ?self.current_uri(), "disconnecting");
        self.teardown();
        self.state = State::Idle;
        self.host_index = 0;

        let reason = DisconnectReason::local_disconnect();
        let event = if was_connected {
            ClientEvent::ConnectionLost { reason }
        } else {
            ClientEvent::ConnectFailed {
                invocation_context: self.options.invocation_context.clone(),
                reason,
            }
        };
        self.events.push_back(event);
        Ok(())
    }

    /// Feed an event reported by the link `link`.
    ///
    /// Events from links that have already been torn down are ignored.
    pub fn handle_transport(&mut self, link: LinkId, event: TransportEvent, now: Instant) {
        if self.link() != Some(link) {
            trace!(%link, "ignoring event from stale link");
            return;
        }

        match event {
            TransportEvent::Opened => self.on_open(now),
            TransportEvent::Message(data) => self.on_message(&data, now),
            TransportEvent::Error(reason) => {
                self.disconnected(DisconnectReason::socket_error(reason), now);
            }
            TransportEvent::Closed => self.disconnected(DisconnectReason::socket_close(), now),
        }
    }

    /// Earliest instant at which [`handle_timeout`](Self::handle_timeout) has work.
    pub fn poll_timeout(&self) -> Option<Instant> {
        [
            self.retry_at,
            self.open_failure.as_ref().map(|(at, _)| *at),
            self.connect_timer.deadline(),
            self.settle_at,
            self.keepalive.deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Fire every timer that is due at `now`.
    pub fn handle_timeout(&mut self, now: Instant) {
        if self.retry_at.is_some_and(|at| now >= at) {
            self.retry_at = None;
            self.open_link(now);
            return;
        }

        if let Some((at, reason)) = self.open_failure.take() {
            if now >= at {
                self.disconnected(DisconnectReason::socket_error(reason), now);
                return;
            }
            self.open_failure = Some((at, reason));
        }

        if self.connect_timer.poll(now) {
            self.disconnected(DisconnectReason::connect_timeout(), now);
            return;
        }

        if self.settle_at.is_some_and(|at| now >= at) {
            self.settle_at = None;
            self.send_connect(now);
        }

        match self.keepalive.poll(now) {
            KeepAliveAction::Idle => {}
            KeepAliveAction::SendPing => self.ping(now),
            KeepAliveAction::TimedOut => self.disconnected(DisconnectReason::ping_timeout(), now),
        }
    }

    /// Next pending client event.
    pub fn poll_event(&mut self) -> Option<ClientEvent> {
        self.events.pop_front()
    }

    /// Drain every pending client event.
    pub fn drain_events(&mut self) -> impl Iterator<Item = ClientEvent> + '_ {
        self.events.drain(..)
    }

    fn open_link(&mut self, now: Instant) {
        let uri = self.options.uris[self.host_index].clone();
        let id = self.last_link.next();
        self.last_link = id;

        self.state = State::Connecting;
        self.assembler.clear();
        // Armed by the first write on the new link.
        self.keepalive = KeepAlive::new(self.options.keep_alive_interval);
        self.connect_timer.start(now);

        let transport = match self.connector.open(&uri, id) {
            Ok(transport) => {
                debug!(%uri, link = %id, "opening link");
                Some(transport)
            }
            Err(err) => {
                warn!(%uri, link = %id, error = %err, "link refused to open");
                self.open_failure = Some((now, err.to_string()));
                None
            }
        };

        self.link = Some(Link {
            id,
            uri,
            transport,
            opened: false,
        });
    }

    fn on_open(&mut self, now: Instant) {
        let Some(link) = self.link.as_mut() else {
            return;
        };
        if link.opened {
            return;
        }
        link.opened = true;
        debug!(uri = %link.uri, link = %link.id, "link open");

        let delay = self.options.open_settle_delay;
        if delay.is_zero() {
            self.send_connect(now);
        } else {
            self.settle_at = Some(now + delay);
        }
    }

    fn on_message(&mut self, data: &[u8], now: Instant) {
        let frames = match self.assembler.push(data) {
            Ok(frames) => frames,
            Err(err) => {
                self.disconnected(DisconnectReason::internal(err), now);
                return;
            }
        };

        let link = self.link();
        let mut frames = frames.into_iter();
        while let Some(frame) = frames.next() {
            self.dispatch(frame, now);
            if self.link() != link {
                let dropped = frames.len();
                if dropped > 0 {
                    debug!(dropped, "dropping frames delivered to a torn-down link");
                }
                break;
            }
        }
    }

    fn dispatch(&mut self, frame: Frame, now: Instant) {
        trace!(kind = %frame.kind, id = ?frame.message_identifier, "frame received");
        match frame.kind {
            FrameType::CONNACK => self.on_connack(now),
            FrameType::PINGRESP => self.keepalive.reset(now),
            kind if kind.is_identified() => {
                self.events.push_back(ClientEvent::MessageArrived(frame));
            }
            kind => self.disconnected(DisconnectReason::protocol_violation(kind), now),
        }
    }

    fn on_connack(&mut self, now: Instant) {
        if self.state == State::Connected {
            debug!("ignoring repeated CONNACK");
            return;
        }
        self.connect_timer.cancel();
        self.settle_at = None;
        self.state = State::Connected;
        info!(uri = ?self.current_uri(), queued = self.queue.len(), "connected");
        self.events.push_back(ClientEvent::Connected {
            invocation_context: self.options.invocation_context.clone(),
        });
        self.flush(now);
    }

    fn send_connect(&mut self, now: Instant) {
        let payload = match self.options.credentials().to_payload() {
            Ok(payload) => payload,
            Err(err) => {
                self.disconnected(DisconnectReason::from(&err), now);
                return;
            }
        };
        debug!(link = ?self.link(), "sending CONNECT");
        let frame = Frame::new(FrameType::CONNECT).with_payload(payload);
        if let Err(err) = self.write(&frame, now) {
            self.disconnected(DisconnectReason::from(&err), now);
        }
    }

    fn ping(&mut self, now: Instant) {
        let Some(link) = self.link.as_mut() else {
            return;
        };
        let Some(transport) = link.transport.as_mut() else {
            return;
        };
        trace!(link = %link.id, "sending PINGREQ");
        if let Err(err) = transport.send(Bytes::from_static(&PING_REQUEST)) {
            self.disconnected(DisconnectReason::socket_error(err), now);
        }
    }

    fn check_sendable(&self, operation: &'static str, kind: FrameType) -> Result<()> {
        if !matches!(self.state, State::Connecting | State::Connected) {
            return Err(ClientError::InvalidState {
                operation,
                state: self.state,
            });
        }
        if !kind.is_identified() {
            return Err(ClientError::InvalidType { kind, operation });
        }
        Ok(())
    }

    fn prepare(&mut self, operation: &'static str, kind: FrameType, payload: Payload) -> Result<Frame> {
        self.check_sendable(operation, kind)?;
        let mut frame = Frame::new(kind).with_identifier(0).with_payload(payload);
        check_size(&frame)?;
        if kind == FrameType::SEND {
            frame.message_identifier = Some(self.next_message_identifier());
        }
        Ok(frame)
    }

    fn next_message_identifier(&mut self) -> u16 {
        let identifier = self.next_identifier;
        self.next_identifier += 1;
        if self.next_identifier >= self.options.max_message_identifier {
            self.next_identifier = 1;
        }
        // max_message_identifier <= 65536, so identifier <= 65535.
        identifier as u16
    }

    fn enqueue(&mut self, frame: Frame, token: Option<DeliveryToken>, now: Instant) {
        trace!(
            kind = %frame.kind,
            id = ?frame.message_identifier,
            queued = self.queue.len() + 1,
            "queueing frame"
        );
        self.queue.push_back(Outbound { frame, token });
        if self.state == State::Connected {
            self.flush(now);
        }
    }

    fn flush(&mut self, now: Instant) {
        while let Some(item) = self.queue.pop_front() {
            if let Err(err) = self.write(&item.frame, now) {
                self.disconnected(DisconnectReason::from(&err), now);
                return;
            }
            if let Some(token) = item.token {
                self.events.push_back(ClientEvent::MessageDelivered(token));
            }
        }
    }

    fn write(&mut self, frame: &Frame, now: Instant) -> Result<()> {
        let wire = frame.encode()?;
        let transport = self
            .link
            .as_mut()
            .and_then(|link| link.transport.as_mut())
            .ok_or(TransportError::NotOpen)?;
        transport.send(wire)?;
        self.keepalive.reset(now);
        Ok(())
    }

    fn teardown(&mut self) {
        self.state = State::Disconnecting;
        self.keepalive.cancel();
        self.connect_timer.cancel();
        self.settle_at = None;
        self.retry_at = None;
        self.open_failure = None;
        self.assembler.clear();

        let dropped = self.queue.len();
        self.queue.clear();

        if let Some(mut link) = self.link.take() {
            if let Some(transport) = link.transport.as_mut() {
                transport.close();
            }
            debug!(uri = %link.uri, link = %link.id, dropped, "link torn down");
        }
    }

    fn disconnected(&mut self, reason: DisconnectReason, now: Instant) {
        let was_connected = self.state == State::Connected;
        warn!(
            uri = ?self.current_uri(),
            code = ?reason.code,
            reason = %reason.message,
            "link lost"
        );
        self.teardown();

        if self.host_index + 1 < self.options.uris.len() {
            self.host_index += 1;
            info!(uri = %self.options.uris[self.host_index], "failing over");
            self.open_link(now);
        } else if was_connected {
            self.state = State::Idle;
            self.host_index = 0;
            self.events.push_back(ClientEvent::ConnectionLost { reason });
        } else {
            self.host_index = 0;
            self.events.push_back(ClientEvent::ConnectFailed {
                invocation_context: self.options.invocation_context.clone(),
                reason,
            });
            let delay = self.options.retry_delay;
            if delay.is_zero() {
                self.open_link(now);
            } else {
                debug!(?delay, "retrying endpoint list");
                self.state = State::Connecting;
                self.retry_at = Some(now + delay);
            }
        }
    }
}

fn check_size(frame: &Frame) -> Result<()> {
    let size = frame.remaining_length();
    if size > mbi::MAX_VALUE {
        return Err(ClientError::Frame(wiremq_frame::FrameError::LengthTooLarge {
            size,
            max: mbi::MAX_VALUE,
        }));
    }
    Ok(())
}
