//! Handler trait and closure handlers.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use super::context::EmberContext;

/// What a handler did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The handler acted on the message.
    Handled,
    /// The message was not for this handler.
    Ignored,
}

/// Processes inbound messages.
pub trait Handler: Send + Sync {
    /// Returns the handler name used in logs.
    fn name(&self) -> &str {
        "unnamed"
    }

    /// Returns `true` if this handler wants the message.
    fn check(&self, _ctx: &EmberContext) -> bool {
        true
    }

    /// Handles the message.
    fn handle(&self, ctx: Arc<EmberContext>) -> BoxFuture<'static, Outcome>;
}

/// A shared handler trait object.
pub type BoxedHandler = Arc<dyn Handler>;

/// A handler backed by an async closure.
pub struct HandlerFn<F> {
    name: String,
    f: F,
}

impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Arc<EmberContext>) -> Fut + Send + Sync,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, ctx: Arc<EmberContext>) -> BoxFuture<'static, Outcome> {
        (self.f)(ctx).boxed()
    }
}

/// Wraps an async closure into a named handler.
///
/// ```rust,ignore
/// let ping = handler_fn("ping", |ctx: Arc<EmberContext>| async move {
///     if ctx.text() == "!ping" {
///         ctx.reply("pong").await.ok();
///         return Outcome::Handled;
///     }
///     Outcome::Ignored
/// });
/// ```
pub fn handler_fn<F, Fut>(name: impl Into<String>, f: F) -> BoxedHandler
where
    F: Fn(Arc<EmberContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    Arc::new(HandlerFn {
        name: name.into(),
        f,
    })
}
