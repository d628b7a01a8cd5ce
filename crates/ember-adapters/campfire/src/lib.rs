//! # Ember Adapter for Campfire
//!
//! This crate connects the Ember bot framework to a Campfire account.
//!
//! ## Overview
//!
//! Campfire is a group-chat service with a REST API and a per-room HTTP
//! stream. This adapter handles:
//!
//! - Authentication and joining the default room
//! - Turning stream messages into framework [`Message`](ember_core::Message)s
//! - Rendering outgoing Markdown to plain text and posting it to the room
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ember_runtime::EmberRuntime;
//! use ember_adapter_campfire::CampfireBackend;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = EmberRuntime::builder().build()?;
//!     let backend = runtime.backend_from_config::<CampfireBackend>()?;
//!     runtime.run(backend).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Room Model
//!
//! ```text
//! CampfireBackend
//! ├── CampfireConnection        authenticated client + joined-room registry
//! │   └── JoinedRoom            room record + live stream
//! └── CampfireRoom              proxy returned by query_room
//! ```
//!
//! Campfire has no direct messages: every message the adapter produces is a
//! group chat message and every reply goes to the default room.

pub mod backend;
pub mod config;
pub mod connection;
pub mod identifier;
pub mod room;

#[cfg(test)]
mod testing;

pub use backend::{BackendState, CampfireBackend};
pub use config::{BotIdentity, CampfireConfig, ServeMode};
pub use connection::{CampfireConnection, JoinedRoom, SharedConnection};
pub use identifier::CampfireIdentifier;
pub use room::CampfireRoom;
