//! Host callbacks.
//!
//! The host is the framework side of a backend: it receives inbound messages
//! and lifecycle notifications. Backends never dispatch commands themselves.

use std::sync::Arc;

use async_trait::async_trait;

use crate::foundation::message::Message;

/// Receiver of backend notifications.
///
/// Backends call these from a single task, in the order events arrived.
#[async_trait]
pub trait BotHost: Send + Sync {
    /// Delivers an inbound message.
    async fn callback_message(&self, message: Message);

    /// Called once the backend is connected and listening.
    async fn connect_callback(&self) {}

    /// Called when the backend stops serving.
    async fn disconnect_callback(&self) {}
}

/// A shared host trait object.
pub type BoxedHost = Arc<dyn BotHost>;
