//! # Ember Transport
//!
//! HTTP client for the Campfire chat service.
//!
//! - [`CampfireClient`]: login, rooms, speaking and user lookups over the
//!   REST API
//! - [`StreamHandle`] / [`StreamEvent`]: the per-room live stream, delivered
//!   over an `mpsc` channel
//! - [`StreamDecoder`]: framing of the streaming body
//!
//! ```rust,ignore
//! let client = CampfireClient::new(ClientConfig::new("acme", "bot", "secret"))?;
//! client.authenticate().await?;
//!
//! let lobby = client.room_by_name("Lobby").await?;
//! client.join(lobby.id).await?;
//!
//! let (tx, mut rx) = mpsc::channel(64);
//! let _stream = client.open_stream(&lobby, tx, CancellationToken::new()).await?;
//! while let Some(event) = rx.recv().await {
//!     // ...
//! }
//! ```

pub mod client;
pub mod model;
pub mod stream;

pub use client::{CampfireClient, ClientConfig};
pub use model::{MessageType, RoomRecord, StreamMessage, UserRecord};
pub use stream::{MAX_FRAME_LEN, StreamDecoder, StreamEvent, StreamHandle};
