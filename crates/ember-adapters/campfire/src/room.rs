//! Campfire room proxy.

use std::any::Any;

use async_trait::async_trait;
use ember_core::{BackendResult, Room};
use ember_transport::{RoomRecord, StreamEvent};
use tokio::sync::mpsc;
use tracing::debug;

use crate::connection::SharedConnection;

/// A Campfire room as seen by the framework.
///
/// Joining routes the room's stream into the owning backend's event
/// channel, so its messages reach the host like those of the default room.
pub struct CampfireRoom {
    record: RoomRecord,
    connection: SharedConnection,
    events: mpsc::Sender<StreamEvent>,
}

impl CampfireRoom {
    pub(crate) fn new(
        record: RoomRecord,
        connection: SharedConnection,
        events: mpsc::Sender<StreamEvent>,
    ) -> Self {
        Self {
            record,
            connection,
            events,
        }
    }

    /// Returns the Campfire room record.
    pub fn record(&self) -> &RoomRecord {
        &self.record
    }

    /// Returns true while the room's stream is live.
    pub fn is_streaming(&self) -> bool {
        self.connection.is_streaming(&self.record.name)
    }
}

#[async_trait]
impl Room for CampfireRoom {
    fn name(&self) -> &str {
        &self.record.name
    }

    fn topic(&self) -> Option<&str> {
        self.record.topic.as_deref()
    }

    fn joined(&self) -> bool {
        self.connection.is_joined(&self.record.name)
    }

    async fn join(&self, _username: Option<&str>, _password: Option<&str>) -> BackendResult<()> {
        debug!(room = %self.record.name, "Joining room");
        self.connection
            .join_room(&self.record.name, self.events.clone())
            .await?;
        Ok(())
    }

    async fn leave(&self, reason: Option<&str>) -> BackendResult<()> {
        debug!(room = %self.record.name, reason = reason.unwrap_or_default(), "Leaving room");
        self.connection.leave_room(&self.record.name).await?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for CampfireRoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CampfireRoom")
            .field("record", &self.record)
            .finish()
    }
}
