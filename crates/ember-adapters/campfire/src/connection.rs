//! Authenticated Campfire session and joined-room registry.

use std::collections::HashMap;
use std::sync::Arc;

use ember_core::{TransportError, TransportResult};
use ember_transport::{
    CampfireClient, RoomRecord, StreamEvent, StreamHandle, StreamMessage, UserRecord,
};
use parking_lot::RwLock;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::CampfireConfig;

/// A joined room and its live stream.
#[derive(Debug)]
pub struct JoinedRoom {
    record: RoomRecord,
    stream: StreamHandle,
}

impl JoinedRoom {
    pub fn record(&self) -> &RoomRecord {
        &self.record
    }

    /// Returns true while the room's stream is delivering messages.
    pub fn is_streaming(&self) -> bool {
        self.stream.is_live()
    }
}

/// An authenticated Campfire session.
///
/// Tracks the rooms the bot has joined, each with its own stream task.
/// Stream output goes to the event sender given at join time; stream
/// failures are reported there as [`StreamEvent::Error`], never returned.
pub struct CampfireConnection {
    client: CampfireClient,
    rooms: RwLock<HashMap<String, JoinedRoom>>,
    join_lock: Mutex<()>,
    cancel: CancellationToken,
}

impl CampfireConnection {
    /// Authenticates with the account in `config`.
    pub async fn connect(config: &CampfireConfig) -> TransportResult<Self> {
        let client = CampfireClient::new(config.client_config())?;
        client.authenticate().await?;
        Ok(Self::with_client(client))
    }

    /// Wraps an already authenticated client.
    pub fn with_client(client: CampfireClient) -> Self {
        Self {
            client,
            rooms: RwLock::new(HashMap::new()),
            join_lock: Mutex::new(()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn client(&self) -> &CampfireClient {
        &self.client
    }

    /// Returns the authenticated user.
    pub fn me(&self) -> Option<UserRecord> {
        self.client.me()
    }

    /// Looks a room up by name without joining it.
    pub async fn find_room(&self, name: &str) -> TransportResult<RoomRecord> {
        self.client.room_by_name(name).await
    }

    /// Joins a room and starts streaming it into `events`.
    ///
    /// Joining a room that is already joined does nothing.
    pub async fn join_room(
        &self,
        name: &str,
        events: mpsc::Sender<StreamEvent>,
    ) -> TransportResult<RoomRecord> {
        let _guard = self.join_lock.lock().await;
        if let Some(record) = self.room(name) {
            debug!(room = %name, "Room already joined");
            return Ok(record);
        }

        let record = self.client.room_by_name(name).await?;
        self.client.join(record.id).await?;
        let stream = match self
            .client
            .open_stream(&record, events, self.cancel.child_token())
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                // The room is joined server-side but never registered; undo it.
                if let Err(leave_err) = self.client.leave(record.id).await {
                    warn!(room = %name, "Failed to leave room after stream error: {leave_err}");
                }
                return Err(e);
            }
        };

        info!(room = %name, id = record.id, "Joined room");
        self.rooms.write().insert(
            name.to_string(),
            JoinedRoom {
                record: record.clone(),
                stream,
            },
        );
        Ok(record)
    }

    /// Returns whether the stream of a joined room is active.
    ///
    /// Only meaningful for rooms joined through [`join_room`]; any other
    /// name reports `false`.
    ///
    /// [`join_room`]: Self::join_room
    pub fn is_streaming(&self, name: &str) -> bool {
        match self.rooms.read().get(name) {
            Some(room) => room.is_streaming(),
            None => {
                debug!(room = %name, "Streaming state queried for a room that was never joined");
                false
            }
        }
    }

    /// Returns true if the room is in the registry.
    pub fn is_joined(&self, name: &str) -> bool {
        self.rooms.read().contains_key(name)
    }

    /// Returns the record of a joined room.
    pub fn room(&self, name: &str) -> Option<RoomRecord> {
        self.rooms.read().get(name).map(|room| room.record.clone())
    }

    /// Returns the records of all joined rooms.
    pub fn joined_rooms(&self) -> Vec<RoomRecord> {
        self.rooms
            .read()
            .values()
            .map(|room| room.record.clone())
            .collect()
    }

    /// Posts a message to a joined room.
    pub async fn speak(&self, room: &str, body: &str) -> TransportResult<StreamMessage> {
        let record = self.room(room).ok_or_else(|| TransportError::RoomNotFound {
            name: room.to_string(),
        })?;
        self.client.speak(record.id, body).await
    }

    /// Stops streaming a room and leaves it. Returns false if the room was
    /// not joined.
    pub async fn leave_room(&self, name: &str) -> TransportResult<bool> {
        let removed = self.rooms.write().remove(name);
        let Some(room) = removed else {
            return Ok(false);
        };
        room.stream.stop();
        self.client.leave(room.record.id).await?;
        info!(room = %name, "Left room");
        Ok(true)
    }

    /// Stops every stream and leaves every joined room.
    ///
    /// Leave failures are logged and do not stop the remaining rooms.
    pub async fn leave_all(&self) {
        let rooms: Vec<(String, JoinedRoom)> = self.rooms.write().drain().collect();
        for (name, room) in rooms {
            room.stream.stop();
            match self.client.leave(room.record.id).await {
                Ok(()) => info!(room = %name, "Left room"),
                Err(e) => warn!(room = %name, error = %e, "Failed to leave room"),
            }
        }
    }

    /// Resolves a user ID to a display name.
    ///
    /// Returns an empty string when there is no user or the lookup fails.
    pub async fn display_name(&self, user_id: Option<u64>) -> String {
        let Some(id) = user_id else {
            return String::new();
        };
        match self.client.user(id).await {
            Ok(user) => user.name,
            Err(e) => {
                warn!(user_id = id, error = %e, "Failed to resolve user");
                String::new()
            }
        }
    }
}

impl Drop for CampfireConnection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for CampfireConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CampfireConnection")
            .field("client", &self.client)
            .field("rooms", &self.rooms.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Shared handle to a connection.
pub type SharedConnection = Arc<CampfireConnection>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeCampfire;

    #[tokio::test]
    async fn test_connect_authenticates() {
        let fake = FakeCampfire::start().await;
        let conn = CampfireConnection::connect(&fake.config()).await.unwrap();
        assert_eq!(conn.me().unwrap().name, "Ember Bot");
        assert!(conn.joined_rooms().is_empty());
    }

    #[tokio::test]
    async fn test_connect_with_bad_password_fails() {
        let fake = FakeCampfire::start().await;
        let mut config = fake.config();
        config.bot_identity.password = "wrong".to_string();

        let err = CampfireConnection::connect(&config).await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_join_room_registers_stream() {
        let fake = FakeCampfire::start().await;
        let conn = CampfireConnection::connect(&fake.config()).await.unwrap();
        let (tx, _rx) = mpsc::channel(8);

        let record = conn.join_room("Lobby", tx.clone()).await.unwrap();
        assert_eq!(record.id, 10);
        assert!(conn.is_joined("Lobby"));
        assert!(conn.is_streaming("Lobby"));

        // Second join is a no-op.
        conn.join_room("Lobby", tx).await.unwrap();
        assert_eq!(fake.joins(), 1);
    }

    #[tokio::test]
    async fn test_is_streaming_unknown_room() {
        let fake = FakeCampfire::start().await;
        let conn = CampfireConnection::connect(&fake.config()).await.unwrap();
        assert!(!conn.is_streaming("Nowhere"));
    }

    #[tokio::test]
    async fn test_stream_error_is_delivered_as_event() {
        let fake = FakeCampfire::start().await;
        let conn = CampfireConnection::connect(&fake.config()).await.unwrap();
        let (tx, mut rx) = mpsc::channel(8);

        // Ops closes its stream right away.
        conn.join_room("Ops", tx).await.unwrap();
        match rx.recv().await.unwrap() {
            StreamEvent::Error { room, error } => {
                assert_eq!(room, "Ops");
                assert!(matches!(error, TransportError::StreamClosed { .. }));
            }
            other => panic!("expected stream error, got {other:?}"),
        }
        assert!(!conn.is_streaming("Ops"));
        assert!(conn.is_joined("Ops"));
    }

    #[tokio::test]
    async fn test_join_unknown_room_fails() {
        let fake = FakeCampfire::start().await;
        let conn = CampfireConnection::connect(&fake.config()).await.unwrap();
        let (tx, _rx) = mpsc::channel(8);

        let err = conn.join_room("Nowhere", tx).await.unwrap_err();
        assert!(matches!(err, TransportError::RoomNotFound { .. }));
        assert!(!conn.is_joined("Nowhere"));
    }

    #[tokio::test]
    async fn test_join_leaves_room_when_stream_fails() {
        let fake = FakeCampfire::start().await;
        let conn = CampfireConnection::connect(&fake.config()).await.unwrap();
        let (tx, _rx) = mpsc::channel(8);

        // Broken accepts the join but refuses the stream.
        let err = conn.join_room("Broken", tx).await.unwrap_err();
        assert!(matches!(err, TransportError::Http { status: 503, .. }));
        assert!(!conn.is_joined("Broken"));
        assert_eq!(fake.joins(), 1);
        assert_eq!(fake.leaves(), 1);
    }

    #[tokio::test]
    async fn test_speak_requires_joined_room() {
        let fake = FakeCampfire::start().await;
        let conn = CampfireConnection::connect(&fake.config()).await.unwrap();

        let err = conn.speak("Lobby", "hi").await.unwrap_err();
        assert!(matches!(err, TransportError::RoomNotFound { .. }));

        let (tx, _rx) = mpsc::channel(8);
        conn.join_room("Lobby", tx).await.unwrap();
        conn.speak("Lobby", "hi").await.unwrap();
        assert_eq!(fake.spoken(), vec!["hi".to_string()]);
    }

    #[tokio::test]
    async fn test_leave_all_clears_registry() {
        let fake = FakeCampfire::start().await;
        let conn = CampfireConnection::connect(&fake.config()).await.unwrap();
        let (tx, _rx) = mpsc::channel(8);
        conn.join_room("Lobby", tx.clone()).await.unwrap();
        conn.join_room("Ops", tx).await.unwrap();

        conn.leave_all().await;
        assert!(conn.joined_rooms().is_empty());
        assert!(!conn.is_streaming("Lobby"));
        assert_eq!(fake.leaves(), 2);
    }

    #[tokio::test]
    async fn test_leave_room() {
        let fake = FakeCampfire::start().await;
        let conn = CampfireConnection::connect(&fake.config()).await.unwrap();
        let (tx, _rx) = mpsc::channel(8);
        conn.join_room("Lobby", tx).await.unwrap();

        assert!(conn.leave_room("Lobby").await.unwrap());
        assert!(!conn.leave_room("Lobby").await.unwrap());
        assert_eq!(fake.leaves(), 1);
    }

    #[tokio::test]
    async fn test_display_name() {
        let fake = FakeCampfire::start().await;
        let conn = CampfireConnection::connect(&fake.config()).await.unwrap();

        assert_eq!(conn.display_name(None).await, "");
        assert_eq!(conn.display_name(Some(7)).await, "alice");
        assert_eq!(conn.display_name(Some(8)).await, "");
    }
}
