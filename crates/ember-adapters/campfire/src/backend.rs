//! Campfire backend.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──connect()──▶ Connected ──shutdown()──▶ ShutDown
//! ```
//!
//! `connect` authenticates, joins the default room (the first entry of
//! `chatroom_presence`) and opens its stream. Stream output of every joined
//! room flows through one event channel that `serve_forever` drains, so
//! messages reach the host one at a time, in arrival order.
//!
//! ```rust,ignore
//! use ember_adapter_campfire::{CampfireBackend, CampfireConfig};
//!
//! let backend = Arc::new(CampfireBackend::new(config)?);
//! backend.serve_forever(host, shutdown_token).await?;
//! ```

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use ember_core::{
    Backend, BackendError, BackendResult, BotHost, BoxedHost, BoxedIdentifier, BoxedRoom,
    ConfigurableBackend, Identifier, Message, MessageKind, Presence, Renderer, TextRenderer,
};
use ember_transport::{StreamEvent, StreamMessage};
use tokio::sync::{Mutex, OnceCell, mpsc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::{CampfireConfig, ServeMode};
use crate::connection::{CampfireConnection, SharedConnection};
use crate::identifier::CampfireIdentifier;
use crate::room::CampfireRoom;

/// Capacity of the stream event channel.
const EVENT_BUFFER: usize = 256;

/// Where a backend is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    /// `connect` has not succeeded yet.
    Uninitialized,
    /// Authenticated and listening to the default room.
    Connected,
    /// Shut down; the backend cannot be reused.
    ShutDown,
}

/// The Campfire backend.
pub struct CampfireBackend {
    config: CampfireConfig,
    default_room: String,
    connection: OnceCell<SharedConnection>,
    identity: OnceLock<Arc<CampfireIdentifier>>,
    shut_down: AtomicBool,
    events_tx: mpsc::Sender<StreamEvent>,
    events_rx: Mutex<mpsc::Receiver<StreamEvent>>,
    renderer: Box<dyn Renderer>,
}

impl CampfireBackend {
    /// Creates a backend. Fails if the configuration names no room.
    pub fn new(config: CampfireConfig) -> BackendResult<Self> {
        config.validate()?;
        let default_room = config
            .default_room()
            .map(str::to_string)
            .ok_or_else(|| BackendError::config("chatroom_presence is empty"))?;

        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        Ok(Self {
            config,
            default_room,
            connection: OnceCell::new(),
            identity: OnceLock::new(),
            shut_down: AtomicBool::new(false),
            events_tx,
            events_rx: Mutex::new(events_rx),
            renderer: Box::new(TextRenderer::new()),
        })
    }

    /// Replaces the renderer applied to outgoing bodies.
    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn config(&self) -> &CampfireConfig {
        &self.config
    }

    /// Returns the room messages are sent to.
    pub fn default_room(&self) -> &str {
        &self.default_room
    }

    pub fn compact_output(&self) -> bool {
        self.config.compact_output
    }

    pub fn state(&self) -> BackendState {
        if self.shut_down.load(Ordering::SeqCst) {
            BackendState::ShutDown
        } else if self.connection.initialized() {
            BackendState::Connected
        } else {
            BackendState::Uninitialized
        }
    }

    /// Returns the live connection.
    pub fn connection(&self) -> BackendResult<SharedConnection> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(BackendError::ShutDown);
        }
        self.connection
            .get()
            .cloned()
            .ok_or(BackendError::NotConnected)
    }

    /// Returns whether the stream of a joined room is live.
    pub fn is_streaming(&self, room: &str) -> bool {
        self.connection
            .get()
            .is_some_and(|conn| conn.is_streaming(room))
    }

    async fn ensure_connected(&self) -> BackendResult<SharedConnection> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(BackendError::ShutDown);
        }

        let conn = self
            .connection
            .get_or_try_init(|| async {
                let conn = CampfireConnection::connect(&self.config).await?;

                let name = conn
                    .me()
                    .map(|me| me.name)
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| self.config.bot_identity.username.clone());

                conn.join_room(&self.default_room, self.events_tx.clone())
                    .await?;
                // Only a fully connected backend has an identity.
                let _ = self.identity.set(Arc::new(CampfireIdentifier::new(name)));
                Ok::<_, BackendError>(Arc::new(conn))
            })
            .await?;

        Ok(Arc::clone(conn))
    }

    /// Turns a stream message into a host callback.
    ///
    /// Only text messages are delivered; everything else is dropped. The
    /// sender is resolved to a display name, or an empty string when the
    /// message has no user. Returns true if the host was called.
    pub async fn handle_stream_message(
        &self,
        host: &dyn BotHost,
        room: &str,
        message: StreamMessage,
    ) -> bool {
        trace!(room = %room, id = message.id, kind = ?message.kind, "Incoming stream message");
        if !message.is_text() {
            return false;
        }

        let sender = match self.connection.get() {
            Some(conn) => conn.display_name(message.user_id).await,
            None => String::new(),
        };

        let mut msg = Message::new(message.body.unwrap_or_default())
            .with_kind(MessageKind::Groupchat)
            .with_frm(Arc::new(CampfireIdentifier::new(sender)));
        if let Some(me) = self.bot_identifier() {
            msg = msg.with_to(me);
        }

        debug!(room = %room, "Incoming message [{msg}]");
        host.callback_message(msg).await;
        true
    }

    async fn serve_until_error(
        &self,
        host: &dyn BotHost,
        events: &mut mpsc::Receiver<StreamEvent>,
        shutdown: &CancellationToken,
    ) -> BackendResult<()> {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested");
                    return Ok(());
                }
                event = events.recv() => match event {
                    Some(StreamEvent::Message { room, message }) => {
                        self.handle_stream_message(host, &room, message).await;
                    }
                    Some(StreamEvent::Error { room, error }) => {
                        error!(room = %room, error = %error, "Stream stopped due to error");
                        return Err(error.into());
                    }
                    None => return Ok(()),
                },
            }
        }
    }

    async fn serve_polling(
        &self,
        host: &dyn BotHost,
        events: &mut mpsc::Receiver<StreamEvent>,
        shutdown: &CancellationToken,
    ) -> BackendResult<()> {
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut was_streaming = true;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested");
                    return Ok(());
                }
                event = events.recv() => match event {
                    Some(StreamEvent::Message { room, message }) => {
                        self.handle_stream_message(host, &room, message).await;
                    }
                    Some(StreamEvent::Error { room, error }) => {
                        error!(room = %room, error = %error, "Stream stopped due to error");
                    }
                    None => return Ok(()),
                },
                _ = ticker.tick() => {
                    let streaming = self.is_streaming(&self.default_room);
                    if !streaming && was_streaming {
                        warn!(room = %self.default_room, "Stream is down; not reconnecting");
                    } else if !streaming {
                        debug!(room = %self.default_room, "Stream still down");
                    }
                    was_streaming = streaming;
                }
            }
        }
    }
}

#[async_trait]
impl Backend for CampfireBackend {
    fn mode(&self) -> &'static str {
        "campfire"
    }

    fn bot_identifier(&self) -> Option<BoxedIdentifier> {
        self.identity
            .get()
            .map(|id| Arc::clone(id) as BoxedIdentifier)
    }

    async fn connect(&self) -> BackendResult<()> {
        self.ensure_connected().await.map(|_| ())
    }

    async fn serve_forever(
        &self,
        host: BoxedHost,
        shutdown: CancellationToken,
    ) -> BackendResult<()> {
        let mut events = self.events_rx.lock().await;

        self.ensure_connected().await?;
        host.connect_callback().await;
        info!(room = %self.default_room, mode = ?self.config.serve_mode, "Campfire connected.");

        let outcome = match self.config.serve_mode {
            ServeMode::UntilError => {
                self.serve_until_error(host.as_ref(), &mut events, &shutdown)
                    .await
            }
            ServeMode::Poll => {
                self.serve_polling(host.as_ref(), &mut events, &shutdown)
                    .await
            }
        };

        host.disconnect_callback().await;
        self.shutdown().await?;
        outcome
    }

    async fn send_message(&self, message: &Message) -> BackendResult<()> {
        let conn = self.connection()?;
        let body = self.renderer.convert(&message.body);
        debug!("Sending message {message}");

        if let Err(e) = conn.speak(&self.default_room, &body).await {
            error!(
                to = message.to_person().unwrap_or_default(),
                body = %message.body,
                error = %e,
                "Failed to send message"
            );
            return Err(e.into());
        }
        Ok(())
    }

    async fn send_simple_reply(
        &self,
        original: &Message,
        text: &str,
        _private: bool,
    ) -> BackendResult<()> {
        debug!(text = %text, "Sending simple reply to {original}");
        // Campfire has no private messages; replies always go to the room.
        let reply = self.build_reply(original, text, false);
        self.send_message(&reply).await
    }

    fn build_message(&self, text: &str) -> Message {
        Message::new(text).with_kind(MessageKind::Groupchat)
    }

    fn build_identifier(&self, text: &str) -> BackendResult<BoxedIdentifier> {
        Ok(Arc::new(CampfireIdentifier::new(text)))
    }

    fn build_reply(&self, original: &Message, text: &str, _private: bool) -> Message {
        let mut reply = self.build_message(text);
        reply.frm = self.bot_identifier();
        reply.to = original.frm.clone();
        reply
    }

    fn prefix_groupchat_reply(&self, message: &mut Message, identifier: &dyn Identifier) {
        message.body = format!("@{} {}", identifier.nick(), message.body);
    }

    async fn query_room(&self, name: &str) -> BackendResult<BoxedRoom> {
        let conn = self.connection()?;
        let record = conn.find_room(name).await?;
        Ok(Arc::new(CampfireRoom::new(
            record,
            conn,
            self.events_tx.clone(),
        )))
    }

    async fn rooms(&self) -> BackendResult<Vec<BoxedRoom>> {
        debug!("Listing rooms is not supported by the Campfire backend");
        Ok(Vec::new())
    }

    async fn change_presence(&self, status: Presence, message: &str) -> BackendResult<()> {
        debug!(status = %status, message = %message, "Presence is not supported by the Campfire backend");
        Ok(())
    }

    async fn shutdown(&self) -> BackendResult<()> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(conn) = self.connection.get() {
            conn.leave_all().await;
        }
        info!("Campfire backend shut down");
        Ok(())
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl ConfigurableBackend for CampfireBackend {
    type Config = CampfireConfig;

    fn name() -> &'static str {
        "campfire"
    }

    fn from_config(config: Self::Config) -> BackendResult<Arc<Self>> {
        Self::new(config).map(Arc::new)
    }
}

impl std::fmt::Debug for CampfireBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CampfireBackend")
            .field("default_room", &self.default_room)
            .field("state", &self.state())
            .finish()
    }
}
