//! Handler context.
//!
//! [`EmberContext`] carries an inbound message together with the backend it
//! came from, so handlers can answer without knowing which service they run
//! on.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::BackendResult;
use crate::foundation::message::Message;
use crate::integration::backend::BoxedBackend;

/// The context object passed to handlers during dispatch.
///
/// # Example
///
/// ```rust,ignore
/// async fn ping(ctx: Arc<EmberContext>) -> Outcome {
///     if ctx.text().trim() != "!ping" {
///         return Outcome::Ignored;
///     }
///     ctx.reply("pong").await.ok();
///     ctx.stop_propagation();
///     Outcome::Handled
/// }
/// ```
pub struct EmberContext {
    /// The inbound message.
    message: Message,
    /// The backend that received it.
    backend: BoxedBackend,
    /// Whether later handlers still see this message.
    is_propagating: AtomicBool,
}

impl EmberContext {
    /// Creates a new context for an inbound message.
    pub fn new(message: Message, backend: BoxedBackend) -> Self {
        Self {
            message,
            backend,
            is_propagating: AtomicBool::new(true),
        }
    }

    /// Returns the inbound message.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Returns the message body.
    pub fn text(&self) -> &str {
        &self.message.body
    }

    /// Returns the backend that received the message.
    pub fn backend(&self) -> &BoxedBackend {
        &self.backend
    }

    /// Replies to the sender of the inbound message.
    pub async fn reply(&self, text: &str) -> BackendResult<()> {
        self.backend
            .send_simple_reply(&self.message, text, false)
            .await
    }

    /// Stops the message from reaching further handlers.
    pub fn stop_propagation(&self) {
        self.is_propagating.store(false, Ordering::SeqCst);
    }

    /// Returns `true` if later handlers should still run.
    pub fn is_propagating(&self) -> bool {
        self.is_propagating.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for EmberContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmberContext")
            .field("message", &self.message)
            .field("backend", &self.backend.mode())
            .field("is_propagating", &self.is_propagating())
            .finish()
    }
}
