//! Message dispatcher.
//!
//! The [`Dispatcher`] hands every inbound message to its handlers in
//! registration order:
//!
//! 1. Handlers whose `check` fails are skipped
//! 2. Every other handler runs and reports an [`Outcome`]
//! 3. Dispatch stops once a handler calls `stop_propagation`
//!
//! ```rust,ignore
//! use ember_core::{Dispatcher, handler_fn};
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.add(handler_fn("log", log_handler));
//! dispatcher.add(handler_fn("echo", echo_handler));
//! ```

use std::sync::Arc;

use tracing::{Instrument, Level, debug, span};

use super::context::EmberContext;
use super::handler::{BoxedHandler, Outcome};
use crate::foundation::message::Message;
use crate::integration::backend::BoxedBackend;

/// Routes inbound messages to handlers.
#[derive(Default, Clone)]
pub struct Dispatcher {
    /// The collection of registered handlers.
    handlers: Vec<BoxedHandler>,
}

impl Dispatcher {
    /// Creates a new, empty dispatcher.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Adds a handler. Handlers run in the order they are added.
    pub fn add(&mut self, handler: BoxedHandler) {
        self.handlers.push(handler);
    }

    /// Adds a handler (builder pattern).
    pub fn with(mut self, handler: BoxedHandler) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Dispatches a message to the registered handlers.
    ///
    /// Returns `true` if any handler reported [`Outcome::Handled`].
    pub async fn dispatch(&self, message: Message, backend: BoxedBackend) -> bool {
        let span = span!(Level::DEBUG, "dispatch", mode = backend.mode());
        self.run_handlers(message, backend).instrument(span).await
    }

    async fn run_handlers(&self, message: Message, backend: BoxedBackend) -> bool {
        let ctx = Arc::new(EmberContext::new(message, backend));
        let mut handled = false;

        for handler in &self.handlers {
            if !handler.check(&ctx) {
                continue;
            }

            if handler.handle(Arc::clone(&ctx)).await == Outcome::Handled {
                handled = true;
            }

            if !ctx.is_propagating() {
                debug!(
                    handler = handler.name(),
                    "Propagation stopped, skipping remaining handlers"
                );
                break;
            }
        }

        handled
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("handler_count", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BackendError, BackendResult};
    use crate::foundation::identifier::{BoxedIdentifier, Identifier};
    use crate::framework::handler::handler_fn;
    use crate::integration::backend::{Backend, Presence};
    use crate::integration::host::BoxedHost;
    use crate::integration::room::BoxedRoom;
    use async_trait::async_trait;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    struct MockBackend;

    #[async_trait]
    impl Backend for MockBackend {
        fn mode(&self) -> &'static str {
            "test"
        }

        fn bot_identifier(&self) -> Option<BoxedIdentifier> {
            None
        }

        async fn connect(&self) -> BackendResult<()> {
            Ok(())
        }

        async fn serve_forever(
            &self,
            _host: BoxedHost,
            _shutdown: CancellationToken,
        ) -> BackendResult<()> {
            Ok(())
        }

        async fn send_message(&self, _message: &Message) -> BackendResult<()> {
            Err(BackendError::NotConnected)
        }

        fn build_message(&self, text: &str) -> Message {
            Message::new(text)
        }

        fn build_identifier(&self, _text: &str) -> BackendResult<BoxedIdentifier> {
            Err(BackendError::Unsupported("build_identifier"))
        }

        fn build_reply(&self, _original: &Message, text: &str, _private: bool) -> Message {
            Message::new(text)
        }

        fn prefix_groupchat_reply(&self, _message: &mut Message, _identifier: &dyn Identifier) {}

        async fn query_room(&self, _name: &str) -> BackendResult<BoxedRoom> {
            Err(BackendError::Unsupported("query_room"))
        }

        async fn rooms(&self) -> BackendResult<Vec<BoxedRoom>> {
            Ok(Vec::new())
        }

        async fn change_presence(&self, _status: Presence, _message: &str) -> BackendResult<()> {
            Ok(())
        }

        async fn shutdown(&self) -> BackendResult<()> {
            Ok(())
        }

        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    fn mock_backend() -> BoxedBackend {
        Arc::new(MockBackend)
    }

    #[tokio::test]
    async fn test_dispatch_no_handlers() {
        let dispatcher = Dispatcher::new();
        let handled = dispatcher.dispatch(Message::new("hi"), mock_backend()).await;
        assert!(!handled);
    }

    #[tokio::test]
    async fn test_dispatch_runs_handlers_in_order() {
        let counter = Arc::new(AtomicUsize::new(0));
        let first = Arc::clone(&counter);
        let second = Arc::clone(&counter);

        let dispatcher = Dispatcher::new()
            .with(handler_fn("first", move |_ctx| {
                let c = Arc::clone(&first);
                async move {
                    assert_eq!(c.fetch_add(1, Ordering::SeqCst), 0);
                    Outcome::Ignored
                }
            }))
            .with(handler_fn("second", move |ctx| {
                let c = Arc::clone(&second);
                async move {
                    assert_eq!(c.fetch_add(1, Ordering::SeqCst), 1);
                    assert_eq!(ctx.text(), "hi");
                    Outcome::Handled
                }
            }));

        let handled = dispatcher.dispatch(Message::new("hi"), mock_backend()).await;
        assert!(handled);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stop_propagation() {
        let counter = Arc::new(AtomicUsize::new(0));
        let later = Arc::clone(&counter);

        let dispatcher = Dispatcher::new()
            .with(handler_fn("stopper", |ctx| async move {
                ctx.stop_propagation();
                Outcome::Handled
            }))
            .with(handler_fn("never", move |_ctx| {
                let c = Arc::clone(&later);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Outcome::Handled
                }
            }));

        assert!(dispatcher.dispatch(Message::new("hi"), mock_backend()).await);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
