//! Tokio driver for [`Engine`].
//!
//! One task owns the engine. It multiplexes application commands, link
//! events and the engine's next deadline, and forwards [`ClientEvent`]s to
//! the [`Client`] handle.

use std::time::Instant;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use wiremq_frame::{FrameType, Payload};
use wiremq_transport::ws::{EventReceiver, WsConnector};
use wiremq_transport::Connector;

use crate::engine::{Engine, State};
use crate::error::{ClientError, Result};
use crate::event::{ClientEvent, DeliveryToken};
use crate::options::ConnectOptions;

enum Command {
    Connect(ConnectOptions, oneshot::Sender<Result<()>>),
    Send {
        kind: FrameType,
        payload: Payload,
        confirm: bool,
        reply: oneshot::Sender<Result<Option<DeliveryToken>>>,
    },
    Reply {
        kind: FrameType,
        message_identifier: u16,
        payload: Payload,
        reply: oneshot::Sender<Result<()>>,
    },
    Disconnect(oneshot::Sender<Result<()>>),
    State(oneshot::Sender<State>),
    CurrentUri(oneshot::Sender<Option<String>>),
}

/// Handle to a client running on a tokio task.
///
/// Dropping the handle stops the task and closes any open link.
pub struct Client {
    commands: mpsc::UnboundedSender<Command>,
    events: mpsc::UnboundedReceiver<ClientEvent>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Client {
    /// Spawn a client that connects over WebSocket.
    pub fn spawn() -> Result<Self> {
        let (connector, links) = WsConnector::new();
        Self::spawn_with(connector, links)
    }

    /// Spawn a client over any connector whose links report into `links`.
    pub fn spawn_with<C>(connector: C, links: EventReceiver) -> Result<Self>
    where
        C: Connector + Send + 'static,
        C::Transport: Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| ClientError::Unsupported("tokio runtime".to_string()))?;

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let task = runtime.spawn(drive(
            Engine::new(connector),
            commands_rx,
            links,
            events_tx,
            cancel.clone(),
        ));

        Ok(Self {
            commands: commands_tx,
            events: events_rx,
            cancel,
            task: Some(task),
        })
    }

    pub async fn connect(&self, options: ConnectOptions) -> Result<()> {
        self.call(|reply| Command::Connect(options, reply)).await?
    }

    pub async fn send(&self, kind: FrameType, payload: impl Into<Payload>) -> Result<()> {
        let payload = payload.into();
        self.call(|reply| Command::Send {
            kind,
            payload,
            confirm: false,
            reply,
        })
        .await??;
        Ok(())
    }

    pub async fn send_confirmed(
        &self,
        kind: FrameType,
        payload: impl Into<Payload>,
    ) -> Result<DeliveryToken> {
        let payload = payload.into();
        let token = self
            .call(|reply| Command::Send {
                kind,
                payload,
                confirm: true,
                reply,
            })
            .await??;
        token.ok_or(ClientError::Stopped)
    }

    pub async fn reply(
        &self,
        kind: FrameType,
        message_identifier: u16,
        payload: impl Into<Payload>,
    ) -> Result<()> {
        let payload = payload.into();
        self.call(|reply| Command::Reply {
            kind,
            message_identifier,
            payload,
            reply,
        })
        .await?
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.call(Command::Disconnect).await?
    }

    pub async fn state(&self) -> Result<State> {
        self.call(Command::State).await
    }

    /// Endpoint of the current link, if any.
    pub async fn current_uri(&self) -> Result<Option<String>> {
        self.call(Command::CurrentUri).await
    }

    /// Wait for the next client event. `None` once the task has stopped.
    pub async fn next_event(&mut self) -> Option<ClientEvent> {
        self.events.recv().await
    }

    /// Stop the task and wait for it to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    async fn call<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(command(reply_tx))
            .map_err(|_| ClientError::Stopped)?;
        reply_rx.await.map_err(|_| ClientError::Stopped)
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn drive<C: Connector>(
    mut engine: Engine<C>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut links: EventReceiver,
    events: mpsc::UnboundedSender<ClientEvent>,
    cancel: CancellationToken,
) {
    loop {
        while let Some(event) = engine.poll_event() {
            let _ = events.send(event);
        }

        let deadline = engine.poll_timeout();
        tokio::select! {
            _ = cancel.cancelled() => break,
            command = commands.recv() => match command {
                Some(command) => execute(&mut engine, command),
                None => break,
            },
            Some((link, event)) = links.recv() => {
                engine.handle_transport(link, event, Instant::now());
            }
            _ = sleep_until(deadline) => engine.handle_timeout(Instant::now()),
        }
    }

    if engine.state() != State::Idle {
        let _ = engine.disconnect();
    }
    debug!("client task stopped");
}

fn execute<C: Connector>(engine: &mut Engine<C>, command: Command) {
    let now = Instant::now();
    match command {
        Command::Connect(options, reply) => {
            let _ = reply.send(engine.connect(options, now));
        }
        Command::Send {
            kind,
            payload,
            confirm,
            reply,
        } => {
            let result = if confirm {
                engine.send_confirmed(kind, payload, now).map(Some)
            } else {
                engine.send(kind, payload, now).map(|()| None)
            };
            let _ = reply.send(result);
        }
        Command::Reply {
            kind,
            message_identifier,
            payload,
            reply,
        } => {
            let _ = reply.send(engine.reply(kind, message_identifier, payload, now));
        }
        Command::Disconnect(reply) => {
            let _ = reply.send(engine.disconnect());
        }
        Command::State(reply) => {
            let _ = reply.send(engine.state());
        }
        Command::CurrentUri(reply) => {
            let _ = reply.send(engine.current_uri().map(str::to_owned));
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}
