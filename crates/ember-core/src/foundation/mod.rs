//! Foundation layer - values exchanged between backends and the framework.
//!
//! This module contains:
//! - Identifiers for chat participants
//! - The message type
//! - Markup renderers

pub mod identifier;
pub mod message;
pub mod render;

pub use identifier::{BoxedIdentifier, Identifier, same_person};
pub use message::{Message, MessageKind};
pub use render::{Renderer, TextRenderer};
