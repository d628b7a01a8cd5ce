//! Integration layer - the contract between backends and the framework.
//!
//! This module contains:
//! - The backend trait and configurable-backend constructor
//! - Host callbacks receiving inbound messages
//! - The room abstraction

pub mod backend;
pub mod host;
pub mod room;

pub use backend::{Backend, BoxedBackend, ConfigurableBackend, Presence, downcast_backend};
pub use host::{BotHost, BoxedHost};
pub use room::{BoxedRoom, Room};
