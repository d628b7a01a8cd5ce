//! Room abstraction.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BackendResult;

/// A multi-user room known to a backend.
///
/// Obtaining a room (see [`Backend::query_room`](crate::Backend::query_room))
/// does not join it; call [`Room::join`] for that.
#[async_trait]
pub trait Room: std::fmt::Debug + Send + Sync {
    /// Returns the room name.
    fn name(&self) -> &str;

    /// Returns the room topic, if the service has one.
    fn topic(&self) -> Option<&str> {
        None
    }

    /// Returns true if the room exists on the service.
    fn exists(&self) -> bool {
        true
    }

    /// Returns true if the backend currently listens to this room.
    fn joined(&self) -> bool;

    /// Joins the room and starts receiving its messages.
    async fn join(&self, username: Option<&str>, password: Option<&str>) -> BackendResult<()>;

    /// Leaves the room.
    async fn leave(&self, reason: Option<&str>) -> BackendResult<()>;

    /// Returns self as `&dyn Any` for downcasting to the backend type.
    fn as_any(&self) -> &dyn Any;
}

/// A shared room trait object.
pub type BoxedRoom = Arc<dyn Room>;
