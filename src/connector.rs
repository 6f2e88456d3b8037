//! Connector builder and runtime loop.
//!
//! The [`ConnectorBuilder`] collects configuration and subscribers. The
//! [`Connector`] it starts runs one task that owns all protocol state:
//! 1. Send `new` and arm the heartbeat
//! 2. Classify, decode and dispatch every inbound frame
//! 3. Answer `hello` with `authorize`, and the ack with `social.presence`
//! 4. Fire the heartbeat and replay flushes when their deadlines pass
//!
//! # Example
//!
//! ```ignore
//! use ribbon_client::{Connector, Handling};
//!
//! #[tokio::main]
//! async fn main() -> ribbon_client::Result<()> {
//!     let connector = Connector::builder()
//!         .token("session-token")
//!         .handling(Handling::default())
//!         .on("kick", |data| eprintln!("kicked: {}", data))
//!         .connect()
//!         .await?;
//!
//!     connector.wait_until_active().await?;
//!     connector.wait_for_shutdown().await
//! }
//! ```

use std::time::Duration;

use bytes::Bytes;
use rmpv::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::codec::MsgPackCodec;
use crate::config::ConnectorConfig;
use crate::error::{RibbonError, Result};
use crate::handler::Dispatcher;
use crate::heartbeat::Heartbeat;
use crate::protocol::{classify, Envelope, FrameKind, Handling, Outbound};
use crate::replay::{ReplayBatch, ReplayBuffer, ReplayFrame};
use crate::session::{ConnectionState, Handshake, Session};
use crate::timer::OneShotTimer;
use crate::transport::{self, spawn_reader_task};
use crate::writer::{spawn_writer_task, WriterHandle};

/// Requests from handles to the connector task.
#[derive(Debug)]
enum Command {
    Send(Bytes),
    StartReplay {
        game_id: serde_json::Value,
        frames: Vec<ReplayFrame>,
    },
    PushFrame(ReplayFrame),
    KeyDown(String),
    KeyUp(String),
    StopReplay,
    Disconnect,
}

/// Builder for configuring and starting a connector.
pub struct ConnectorBuilder {
    config: ConnectorConfig,
    dispatcher: Dispatcher,
}

impl ConnectorBuilder {
    /// Create a builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: ConnectorConfig::default(),
            dispatcher: Dispatcher::new(),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ConnectorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = token.into();
        self
    }

    pub fn handling(mut self, handling: Handling) -> Self {
        self.config.handling = handling;
        self
    }

    /// Gateway URL used by [`connect`](Self::connect).
    pub fn gateway(mut self, url: impl Into<String>) -> Self {
        self.config.gateway = url.into();
        self
    }

    /// Default: 5 seconds
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.heartbeat_interval = interval;
        self
    }

    /// Default: 500 ms
    pub fn replay_interval(mut self, interval: Duration) -> Self {
        self.config.replay_interval = interval;
        self
    }

    /// `None` disables the deadline. Default: 10 seconds
    pub fn handshake_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    pub fn commit_id(mut self, id: impl Into<String>) -> Self {
        self.config.commit_id = id.into();
        self
    }

    /// Default: 1024
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// Subscribe to a command with a raw payload handler.
    pub fn on<F>(mut self, command: &str, handler: F) -> Self
    where
        F: FnMut(&Value) + Send + 'static,
    {
        self.dispatcher.on(command, handler);
        self
    }

    /// Subscribe to a command with a typed payload handler.
    pub fn on_typed<T, F>(mut self, command: &str, handler: F) -> Self
    where
        T: DeserializeOwned + 'static,
        F: FnMut(T) + Send + 'static,
    {
        self.dispatcher.on_typed(command, handler);
        self
    }

    /// Subscribe to every command.
    pub fn on_any<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&str, &Value) + Send + 'static,
    {
        self.dispatcher.on_any(handler);
        self
    }

    /// Open the WebSocket and start the connector.
    pub async fn connect(self) -> Result<Connector> {
        self.config.validate()?;

        let (sink, stream) = transport::connect(&self.config.gateway).await?;

        let capacity = self.config.channel_capacity;
        let (writer, outbound_rx) = WriterHandle::channel(capacity);
        let writer_task = spawn_writer_task(sink, outbound_rx);

        let (inbound_tx, inbound_rx) = mpsc::channel(capacity);
        let reader_task = spawn_reader_task(stream, inbound_tx);

        let mut connector = Connector::spawn(self.config, self.dispatcher, inbound_rx, writer);
        connector.io = Some(IoTasks {
            reader: reader_task,
            writer: writer_task,
        });
        Ok(connector)
    }

    /// Start the connector over an existing message transport.
    ///
    /// Each item on `inbound` is one binary message from the server; every
    /// outbound message is pushed onto `outbound`. The connector behaves as if
    /// the socket had just opened.
    pub fn attach(
        self,
        inbound: mpsc::Receiver<Bytes>,
        outbound: mpsc::Sender<Bytes>,
    ) -> Result<Connector> {
        self.config.validate()?;
        let writer = WriterHandle::from_sender(outbound);
        Ok(Connector::spawn(self.config, self.dispatcher, inbound, writer))
    }
}

impl Default for ConnectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable handle for talking to a running connector.
///
/// All methods queue a request and return immediately.
#[derive(Debug, Clone)]
pub struct ConnectorHandle {
    commands: mpsc::Sender<Command>,
}

impl ConnectorHandle {
    fn request(&self, command: Command) -> Result<()> {
        self.commands.try_send(command).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                RibbonError::Transport("command queue full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => RibbonError::ConnectionClosed,
        })
    }

    /// Encode `message` and send it as-is.
    pub fn send<T: Serialize + ?Sized>(&self, message: &T) -> Result<()> {
        let bytes = MsgPackCodec::encode(message)?;
        self.request(Command::Send(Bytes::from(bytes)))
    }

    /// Send `{command, data}`.
    pub fn send_command<T: Serialize>(&self, command: &str, data: T) -> Result<()> {
        self.send(&Outbound::new(command, data))
    }

    /// Begin streaming a replay for `game_id`, starting with `frames`.
    ///
    /// The first batch is flushed at once. A running replay is replaced after
    /// its queued frames are sent under its own game id.
    pub fn start_replay(
        &self,
        game_id: impl Into<serde_json::Value>,
        frames: Vec<ReplayFrame>,
    ) -> Result<()> {
        self.request(Command::StartReplay {
            game_id: game_id.into(),
            frames,
        })
    }

    /// Queue a frame on the running replay.
    pub fn push_frame(&self, frame: ReplayFrame) -> Result<()> {
        self.request(Command::PushFrame(frame))
    }

    pub fn key_down(&self, key: impl Into<String>) -> Result<()> {
        self.request(Command::KeyDown(key.into()))
    }

    pub fn key_up(&self, key: impl Into<String>) -> Result<()> {
        self.request(Command::KeyUp(key.into()))
    }

    /// Stop the replay flush timer and drop the replay.
    pub fn stop_replay(&self) -> Result<()> {
        self.request(Command::StopReplay)
    }

    /// Cancel all timers and stop the connector.
    pub fn disconnect(&self) -> Result<()> {
        self.request(Command::Disconnect)
    }
}

struct IoTasks {
    reader: JoinHandle<()>,
    writer: JoinHandle<Result<()>>,
}

/// A running connector.
pub struct Connector {
    handle: ConnectorHandle,
    state: watch::Receiver<ConnectionState>,
    handshake_timeout: Option<Duration>,
    task: JoinHandle<Result<()>>,
    io: Option<IoTasks>,
}

impl Connector {
    /// Create a new connector builder.
    pub fn builder() -> ConnectorBuilder {
        ConnectorBuilder::new()
    }

    fn spawn(
        config: ConnectorConfig,
        dispatcher: Dispatcher,
        inbound: mpsc::Receiver<Bytes>,
        writer: WriterHandle,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(config.channel_capacity);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Init);
        let handshake_timeout = config.handshake_timeout;

        let runtime = ConnectorTask::new(config, dispatcher, writer, state_tx);
        let task = tokio::spawn(runtime.run(inbound, command_rx));

        Connector {
            handle: ConnectorHandle {
                commands: command_tx,
            },
            state: state_rx,
            handshake_timeout,
            task,
            io: None,
        }
    }

    /// A cloneable handle to this connector.
    pub fn handle(&self) -> ConnectorHandle {
        self.handle.clone()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Wait until the handshake completes.
    ///
    /// This is the session-start notification: it resolves once
    /// `social.presence` has been sent.
    pub async fn wait_until_active(&self) -> Result<()> {
        let mut state = self.state.clone();
        let reached = *state
            .wait_for(|s| *s == ConnectionState::Active || s.is_terminal())
            .await
            .map_err(|_| RibbonError::ConnectionClosed)?;

        match reached {
            ConnectionState::Active => Ok(()),
            ConnectionState::Failed => Err(RibbonError::HandshakeTimeout(
                self.handshake_timeout.unwrap_or_default(),
            )),
            _ => Err(RibbonError::ConnectionClosed),
        }
    }

    pub fn send<T: Serialize + ?Sized>(&self, message: &T) -> Result<()> {
        self.handle.send(message)
    }

    pub fn start_replay(
        &self,
        game_id: impl Into<serde_json::Value>,
        frames: Vec<ReplayFrame>,
    ) -> Result<()> {
        self.handle.start_replay(game_id, frames)
    }

    pub fn push_frame(&self, frame: ReplayFrame) -> Result<()> {
        self.handle.push_frame(frame)
    }

    pub fn key_down(&self, key: impl Into<String>) -> Result<()> {
        self.handle.key_down(key)
    }

    pub fn key_up(&self, key: impl Into<String>) -> Result<()> {
        self.handle.key_up(key)
    }

    pub fn stop_replay(&self) -> Result<()> {
        self.handle.stop_replay()
    }

    pub fn disconnect(&self) -> Result<()> {
        self.handle.disconnect()
    }

    /// Wait for the connector task to end (socket closed, disconnect, or
    /// handshake failure).
    pub async fn wait_for_shutdown(self) -> Result<()> {
        // the handle stays alive until the task ends; dropping every handle
        // is a disconnect
        let Connector {
            handle: _handle,
            task,
            io,
            ..
        } = self;

        let result = task
            .await
            .map_err(|e| RibbonError::Transport(format!("connector task failed: {}", e)))?;

        if let Some(io) = io {
            io.reader.abort();
            match io.writer.await {
                Ok(Err(e)) => tracing::warn!("Writer task error: {}", e),
                Err(e) => tracing::warn!("Writer task failed: {}", e),
                Ok(Ok(())) => {}
            }
        }

        result
    }
}

async fn replay_due(replay: &mut Option<ReplayBuffer>) {
    match replay {
        Some(replay) => replay.due().await,
        None => std::future::pending().await,
    }
}

/// State owned by the connector task.
struct ConnectorTask {
    session: Session,
    handshake: Handshake,
    dispatcher: Dispatcher,
    heartbeat: Heartbeat,
    replay: Option<ReplayBuffer>,
    replay_interval: Duration,
    handshake_timer: OneShotTimer,
    handshake_timeout: Option<Duration>,
    writer: WriterHandle,
    state_tx: watch::Sender<ConnectionState>,
}

impl ConnectorTask {
    fn new(
        config: ConnectorConfig,
        dispatcher: Dispatcher,
        writer: WriterHandle,
        state_tx: watch::Sender<ConnectionState>,
    ) -> Self {
        Self {
            session: Session::new(config.token, config.handling),
            handshake: Handshake::new(config.commit_id),
            dispatcher,
            heartbeat: Heartbeat::new(config.heartbeat_interval),
            replay: None,
            replay_interval: config.replay_interval,
            handshake_timer: OneShotTimer::new(),
            handshake_timeout: config.handshake_timeout,
            writer,
            state_tx,
        }
    }

    /// Main loop - reads messages, commands and deadlines until shutdown.
    async fn run(
        mut self,
        mut inbound: mpsc::Receiver<Bytes>,
        mut commands: mpsc::Receiver<Command>,
    ) -> Result<()> {
        self.open();

        let result = loop {
            tokio::select! {
                message = inbound.recv() => match message {
                    Some(bytes) => self.handle_message(&bytes),
                    None => {
                        tracing::info!("Inbound stream closed");
                        break Ok(());
                    }
                },
                command = commands.recv() => match command {
                    Some(Command::Disconnect) | None => {
                        tracing::debug!("Disconnect requested");
                        break Ok(());
                    }
                    Some(command) => self.handle_command(command),
                },
                ping = self.heartbeat.due() => {
                    self.writer.send_logged(ping, "heartbeat");
                }
                _ = replay_due(&mut self.replay) => self.flush_replay(),
                _ = self.handshake_timer.expired() => {
                    let timeout = self.handshake_timeout.unwrap_or_default();
                    tracing::error!(
                        "Handshake not completed within {:?} (state {:?})",
                        timeout,
                        self.session.state()
                    );
                    self.session.set_state(ConnectionState::Failed);
                    break Err(RibbonError::HandshakeTimeout(timeout));
                }
            }
        };

        self.shutdown();
        result
    }

    fn open(&mut self) {
        match self.handshake.on_open(&mut self.session) {
            Ok(bytes) => self.writer.send_logged(bytes, "new"),
            Err(e) => tracing::error!("Failed to encode new request: {}", e),
        }
        self.heartbeat.arm();
        if let Some(timeout) = self.handshake_timeout {
            self.handshake_timer.arm(timeout);
        }
        self.publish_state();
    }

    fn handle_message(&mut self, message: &[u8]) {
        let frame = match classify(message) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("Dropping inbound frame: {}", e);
                return;
            }
        };

        if frame.is_heartbeat_request() {
            self.heartbeat.arm();
            return;
        }
        if frame.kind == FrameKind::Extension {
            tracing::debug!("Ignoring extension frame {:02X?}", &frame.body[..]);
            return;
        }

        let Some(value) = frame.into_value() else {
            return;
        };
        match Envelope::from_value(value) {
            Ok(envelope) => self.handle_envelope(&envelope),
            Err(e) => tracing::warn!("Dropping frame without envelope: {}", e),
        }
    }

    fn handle_envelope(&mut self, envelope: &Envelope) {
        tracing::trace!("Dispatching {} (id {:?})", envelope.command, envelope.id);
        self.dispatcher.dispatch(&mut self.session, envelope);

        match self.handshake.on_envelope(&mut self.session, envelope) {
            Ok(Some(reply)) => self.writer.send_logged(reply, "handshake reply"),
            Ok(None) => {}
            Err(e) => tracing::error!("Failed to encode handshake reply: {}", e),
        }

        if self.session.state() == ConnectionState::Active {
            self.handshake_timer.cancel();
        }
        self.publish_state();
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Send(bytes) => self.writer.send_logged(bytes, "command"),
            Command::StartReplay { game_id, frames } => {
                if let Some(mut previous) = self.replay.take() {
                    tracing::info!("Replacing replay for game {}", previous.game_id());
                    previous.cancel();
                    if previous.pending_len() > 0 {
                        self.send_batch(previous.flush());
                    }
                }
                self.replay =
                    Some(ReplayBuffer::new(game_id, self.replay_interval).with_frames(frames));
                self.flush_replay();
            }
            Command::PushFrame(frame) => match self.replay.as_mut() {
                Some(replay) => replay.append(frame),
                None => tracing::warn!("No active replay, dropping {} frame", frame.kind),
            },
            Command::KeyDown(key) => match self.replay.as_mut() {
                Some(replay) => replay.key_down(&key),
                None => tracing::warn!("No active replay, dropping keydown {}", key),
            },
            Command::KeyUp(key) => match self.replay.as_mut() {
                Some(replay) => replay.key_up(&key),
                None => tracing::warn!("No active replay, dropping keyup {}", key),
            },
            Command::StopReplay => {
                if let Some(mut replay) = self.replay.take() {
                    replay.cancel();
                    tracing::debug!(
                        "Stopped replay for game {} ({} frames unsent)",
                        replay.game_id(),
                        replay.pending_len()
                    );
                }
            }
            // intercepted by the run loop
            Command::Disconnect => {}
        }
    }

    fn flush_replay(&mut self) {
        let Some(replay) = self.replay.as_mut() else {
            return;
        };
        let batch = replay.flush();
        self.send_batch(batch);
    }

    fn send_batch(&self, batch: ReplayBatch) {
        match batch.encode() {
            Ok(bytes) => self.writer.send_logged(Bytes::from(bytes), "replay"),
            Err(e) => tracing::error!("Failed to encode replay batch: {}", e),
        }
    }

    fn publish_state(&self) {
        let state = self.session.state();
        self.state_tx.send_if_modified(|current| {
            if *current != state {
                *current = state;
                true
            } else {
                false
            }
        });
    }

    fn shutdown(&mut self) {
        self.heartbeat.cancel();
        self.handshake_timer.cancel();
        if let Some(replay) = self.replay.as_mut() {
            replay.cancel();
        }
        if !self.session.state().is_terminal() {
            self.session.set_state(ConnectionState::Closed);
        }
        self.publish_state();
        tracing::info!("Connector stopped ({:?})", self.session.state());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::tag;
    use serde_json::json;

    fn task() -> (ConnectorTask, mpsc::Receiver<Bytes>) {
        let (writer, rx) = WriterHandle::channel(64);
        let (state_tx, _state_rx) = watch::channel(ConnectionState::Init);
        let config = ConnectorConfig {
            token: "tok".to_string(),
            ..Default::default()
        };
        (ConnectorTask::new(config, Dispatcher::new(), writer, state_tx), rx)
    }

    fn standard(value: serde_json::Value) -> Vec<u8> {
        let mut bytes = vec![tag::STANDARD];
        bytes.extend(MsgPackCodec::encode(&value).unwrap());
        bytes
    }

    fn decode(bytes: &Bytes) -> serde_json::Value {
        MsgPackCodec::decode(bytes).unwrap()
    }

    #[test]
    fn test_builder_configuration() {
        let builder = Connector::builder()
            .token("abc")
            .gateway("ws://localhost:9000")
            .heartbeat_interval(Duration::from_secs(2))
            .replay_interval(Duration::from_millis(250))
            .handshake_timeout(None)
            .commit_id("deadbee")
            .channel_capacity(16)
            .on("hello", |_| {})
            .on_any(|_, _| {});

        assert_eq!(builder.config.token, "abc");
        assert_eq!(builder.config.gateway, "ws://localhost:9000");
        assert_eq!(builder.config.heartbeat_interval, Duration::from_secs(2));
        assert_eq!(builder.config.replay_interval, Duration::from_millis(250));
        assert_eq!(builder.config.handshake_timeout, None);
        assert_eq!(builder.config.commit_id, "deadbee");
        assert_eq!(builder.config.channel_capacity, 16);
        assert_eq!(builder.dispatcher.handler_count("hello"), 1);
    }

    #[tokio::test]
    async fn test_attach_rejects_invalid_config() {
        let (_in_tx, in_rx) = mpsc::channel(1);
        let (out_tx, _out_rx) = mpsc::channel(1);
        let result = Connector::builder().channel_capacity(0).attach(in_rx, out_tx);
        assert!(matches!(result, Err(RibbonError::Config(_))));
    }

    #[tokio::test]
    async fn test_open_sends_new_and_arms_heartbeat() {
        let (mut task, mut rx) = task();

        task.open();

        assert_eq!(decode(&rx.try_recv().unwrap()), json!({ "command": "new" }));
        assert!(task.heartbeat.is_armed());
        assert!(task.handshake_timer.is_armed());
        assert_eq!(task.session.state(), ConnectionState::Connecting);
    }

    #[tokio::test]
    async fn test_heartbeat_request_rearms_without_dispatch() {
        let (mut task, _rx) = task();
        let hits = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let hits_clone = hits.clone();
        task.dispatcher.on_any(move |_, _| {
            hits_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        assert!(!task.heartbeat.is_armed());
        task.handle_message(&[0xB0, 0x0C]);

        assert!(task.heartbeat.is_armed());
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(task.session.next_request_id(), 1);
    }

    #[tokio::test]
    async fn test_other_extension_does_not_rearm() {
        let (mut task, mut rx) = task();

        task.handle_message(&[0xB0, 0x0B]);
        task.handle_message(&[0xB0]);

        assert!(!task.heartbeat.is_armed());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_bad_frames_are_dropped() {
        let (mut task, mut rx) = task();
        task.open();
        rx.try_recv().unwrap();

        task.handle_message(&[]);
        task.handle_message(&[0x12, 0x34]);
        task.handle_message(&[tag::STANDARD, 0xc1]);
        task.handle_message(&standard(json!({ "no": "command" })));

        assert!(rx.try_recv().is_err());
        assert_eq!(task.session.state(), ConnectionState::Connecting);
    }

    #[tokio::test]
    async fn test_hello_dispatches_then_authorizes() {
        let (mut task, mut rx) = task();
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        task.dispatcher
            .on("hello", move |_| seen_clone.lock().unwrap().push("hello"));

        task.open();
        rx.try_recv().unwrap();

        task.handle_message(&standard(json!({ "command": "hello", "data": {} })));

        assert_eq!(*seen.lock().unwrap(), vec!["hello"]);
        let auth = decode(&rx.try_recv().unwrap());
        assert_eq!(auth["command"], "authorize");
        assert_eq!(auth["id"], 1);
        assert_eq!(auth["data"]["token"], "tok");
    }

    #[tokio::test]
    async fn test_authorize_ack_cancels_handshake_timer() {
        let (mut task, mut rx) = task();
        task.open();
        task.handle_message(&standard(json!({ "command": "hello" })));
        task.handle_message(&standard(json!({ "command": "authorize", "id": 3 })));

        assert_eq!(task.session.state(), ConnectionState::Active);
        assert!(!task.handshake_timer.is_armed());
        assert_eq!(task.session.next_request_id(), 4);

        let sent: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).map(|b| decode(&b)).collect();
        let commands: Vec<_> = sent.iter().map(|m| m["command"].as_str().unwrap()).collect();
        assert_eq!(commands, ["new", "authorize", "social.presence"]);
    }

    #[tokio::test]
    async fn test_replay_commands() {
        let (mut task, mut rx) = task();

        task.handle_command(Command::PushFrame(ReplayFrame::new("keydown", json!({}))));
        assert!(task.replay.is_none());

        task.handle_command(Command::StartReplay {
            game_id: json!("g"),
            frames: vec![ReplayFrame::new("start", json!({}))],
        });
        let first = decode(&rx.try_recv().unwrap());
        assert_eq!(first["command"], "replay");
        assert_eq!(first["data"]["frames"][0]["type"], "start");
        assert_eq!(first["data"]["provisioned"], 0);
        assert!(task.replay.as_ref().unwrap().is_scheduled());

        task.handle_command(Command::KeyDown("hardDrop".to_string()));
        task.handle_command(Command::KeyUp("hardDrop".to_string()));
        task.flush_replay();
        let second = decode(&rx.try_recv().unwrap());
        assert_eq!(second["data"]["provisioned"], 1);
        assert_eq!(second["data"]["frames"].as_array().unwrap().len(), 2);

        task.handle_command(Command::StopReplay);
        assert!(task.replay.is_none());
    }

    #[tokio::test]
    async fn test_replacing_replay_sends_queued_frames() {
        let (mut task, mut rx) = task();

        task.handle_command(Command::StartReplay {
            game_id: json!("g1"),
            frames: vec![],
        });
        rx.try_recv().unwrap();
        task.handle_command(Command::PushFrame(ReplayFrame::new(
            "keydown",
            json!({ "key": "hold" }),
        )));

        task.handle_command(Command::StartReplay {
            game_id: json!(2),
            frames: vec![],
        });

        let old = decode(&rx.try_recv().unwrap());
        assert_eq!(old["data"]["gameid"], "g1");
        assert_eq!(old["data"]["provisioned"], 1);
        assert_eq!(old["data"]["frames"][0]["data"]["key"], "hold");

        let new = decode(&rx.try_recv().unwrap());
        assert_eq!(new["data"]["gameid"], 2);
        assert_eq!(new["data"]["provisioned"], 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_shutdown_cancels_timers() {
        let (mut task, _rx) = task();
        task.open();
        task.handle_command(Command::StartReplay {
            game_id: json!("g"),
            frames: vec![],
        });

        task.shutdown();

        assert!(!task.heartbeat.is_armed());
        assert!(!task.handshake_timer.is_armed());
        assert!(!task.replay.as_ref().unwrap().is_scheduled());
        assert_eq!(task.session.state(), ConnectionState::Closed);
    }
}
