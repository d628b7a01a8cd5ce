//! Backend trait.
//!
//! A backend connects the framework to one chat service. It owns the
//! connection, turns wire events into [`Message`]s for the [`BotHost`] and
//! turns outgoing [`Message`]s into service calls.
//!
//! # Lifecycle
//!
//! ```text
//! uninitialized ──connect()──▶ connected ──shutdown()──▶ shut down
//! ```
//!
//! [`Backend::serve_forever`] connects, notifies the host and then blocks
//! until the backend stops on its own or the shutdown token is cancelled.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::BackendResult;
use crate::foundation::identifier::{BoxedIdentifier, Identifier};
use crate::foundation::message::Message;
use crate::integration::host::BoxedHost;
use crate::integration::room::BoxedRoom;

/// Presence states a backend may advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    /// Available.
    #[default]
    Online,
    /// Away from keyboard.
    Away,
    /// Do not disturb.
    Dnd,
    /// Offline.
    Offline,
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Dnd => "dnd",
            Self::Offline => "offline",
        })
    }
}

/// The core backend trait.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Returns the backend mode name (e.g., "campfire").
    fn mode(&self) -> &'static str;

    /// Returns the bot's own identity once connected.
    fn bot_identifier(&self) -> Option<BoxedIdentifier>;

    /// Connects to the service. Calling it again is a no-op.
    async fn connect(&self) -> BackendResult<()>;

    /// Connects, notifies the host and serves until stopped.
    ///
    /// Returns when the backend stops on its own (for example when its
    /// stream fails) or when `shutdown` is cancelled. The host's
    /// `disconnect_callback` has been called and the backend shut down by
    /// the time this returns.
    async fn serve_forever(&self, host: BoxedHost, shutdown: CancellationToken)
    -> BackendResult<()>;

    /// Sends a message. Transport failures are returned to the caller.
    async fn send_message(&self, message: &Message) -> BackendResult<()>;

    /// Builds a reply to `original` and sends it.
    async fn send_simple_reply(
        &self,
        original: &Message,
        text: &str,
        private: bool,
    ) -> BackendResult<()> {
        let reply = self.build_reply(original, text, private);
        self.send_message(&reply).await
    }

    /// Builds an outgoing message with the given body.
    fn build_message(&self, text: &str) -> Message;

    /// Builds an identifier from its string form.
    fn build_identifier(&self, text: &str) -> BackendResult<BoxedIdentifier>;

    /// Builds a reply addressed to the sender of `original`.
    fn build_reply(&self, original: &Message, text: &str, private: bool) -> Message;

    /// Rewrites a group chat reply so that it mentions `identifier`.
    fn prefix_groupchat_reply(&self, message: &mut Message, identifier: &dyn Identifier);

    /// Looks up a room by name without joining it.
    async fn query_room(&self, name: &str) -> BackendResult<BoxedRoom>;

    /// Returns the rooms the bot is in.
    async fn rooms(&self) -> BackendResult<Vec<BoxedRoom>>;

    /// Changes the bot's presence.
    async fn change_presence(&self, status: Presence, message: &str) -> BackendResult<()>;

    /// Disconnects from the service. Calling it again is a no-op.
    async fn shutdown(&self) -> BackendResult<()>;

    /// Returns self as an `Arc<dyn Any>` for safe downcasting.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// A shared backend trait object.
pub type BoxedBackend = Arc<dyn Backend>;

/// Trait for backends that can be created from configuration.
///
/// The runtime deserializes the backend's section of the configuration file
/// (`[adapters.<name>]`) into `Config` and calls [`from_config`].
///
/// [`from_config`]: ConfigurableBackend::from_config
pub trait ConfigurableBackend: Backend {
    /// The configuration type for this backend.
    type Config: serde::de::DeserializeOwned + Default;

    /// Returns the configuration section name (e.g., "campfire").
    fn name() -> &'static str
    where
        Self: Sized;

    /// Creates a backend from its configuration.
    fn from_config(config: Self::Config) -> BackendResult<Arc<Self>>
    where
        Self: Sized;
}

/// Attempts to downcast a [`BoxedBackend`] to a concrete backend type.
pub fn downcast_backend<T: Backend + 'static>(backend: BoxedBackend) -> Option<Arc<T>> {
    Arc::downcast::<T>(backend.as_any()).ok()
}
