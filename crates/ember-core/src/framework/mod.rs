//! Framework layer - routing inbound messages to handlers.

pub mod context;
pub mod dispatcher;
pub mod handler;

pub use context::EmberContext;
pub use dispatcher::Dispatcher;
pub use handler::{BoxedHandler, Handler, HandlerFn, Outcome, handler_fn};
