//! # Ember Core
//!
//! The backend contract of the Ember chat-bot framework.
//!
//! A backend connects the framework to one chat service. This crate defines
//! what every backend implements and what the framework gives back to it.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! Values exchanged across the contract:
//! - **Identifiers**: chat participants ([`Identifier`], [`BoxedIdentifier`])
//! - **Messages**: text plus sender and recipient ([`Message`])
//! - **Renderers**: Markdown to service markup ([`Renderer`], [`TextRenderer`])
//!
//! ### Integration Layer
//!
//! - **Backend**: connection lifecycle and service calls ([`Backend`])
//! - **Host**: inbound message and lifecycle callbacks ([`BotHost`])
//! - **Rooms**: multi-user rooms ([`Room`])
//!
//! ### Framework Layer
//!
//! - **Handlers**: message processing ([`Handler`], [`handler_fn`])
//! - **Dispatcher**: ordered delivery with propagation control ([`Dispatcher`])
//!
//! ## Message Flow
//!
//! ```text
//! ┌───────────┐  callback_message  ┌──────┐     ┌────────────┐     ┌─────────┐
//! │  Backend  │───────────────────▶│ Host │────▶│ Dispatcher │────▶│ Handler │
//! │(Campfire) │◀───────────────────┴──────┴─────┴────────────┴─────│         │
//! └───────────┘           send_message / send_simple_reply          └─────────┘
//! ```

// Architectural layers
pub mod error;
pub mod foundation;
pub mod framework;
pub mod integration;

pub use error::{BackendError, BackendResult, TransportError, TransportResult};

// Re-export foundation types
pub use foundation::{
    BoxedIdentifier, Identifier, Message, MessageKind, Renderer, TextRenderer, same_person,
};

// Re-export framework types
pub use framework::{
    BoxedHandler, Dispatcher, EmberContext, Handler, HandlerFn, Outcome, handler_fn,
};

// Re-export integration types
pub use integration::{
    Backend, BotHost, BoxedBackend, BoxedHost, BoxedRoom, ConfigurableBackend, Presence, Room,
    downcast_backend,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::*;
    pub use super::framework::{EmberContext, Handler, Outcome, handler_fn};
    pub use super::integration::{Backend, BotHost, Room};
}
