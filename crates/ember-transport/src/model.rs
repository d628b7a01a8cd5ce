//! Campfire wire models.
//!
//! Only the fields the adapter needs are modelled; unknown fields are
//! ignored so that API additions do not break decoding.

use serde::{Deserialize, Serialize};

/// A Campfire account user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// User ID.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// E-mail address, hidden for other users on some plans.
    #[serde(default)]
    pub email_address: Option<String>,
    /// Whether the user administers the account.
    #[serde(default)]
    pub admin: bool,
    /// API token; only present for the authenticated user.
    #[serde(default)]
    pub api_auth_token: Option<String>,
}

/// A Campfire room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRecord {
    /// Room ID.
    pub id: u64,
    /// Room name.
    pub name: String,
    /// Room topic.
    #[serde(default)]
    pub topic: Option<String>,
    /// Maximum number of occupants.
    #[serde(default)]
    pub membership_limit: Option<u32>,
    /// Whether the room is locked.
    #[serde(default)]
    pub locked: bool,
}

/// Campfire message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    TextMessage,
    PasteMessage,
    TweetMessage,
    SoundMessage,
    UploadMessage,
    EnterMessage,
    LeaveMessage,
    KickMessage,
    TimestampMessage,
    TopicChangeMessage,
    LockMessage,
    UnlockMessage,
    IdleMessage,
    UnidleMessage,
    AllowGuestsMessage,
    DisallowGuestsMessage,
    AdvertisementMessage,
    SystemMessage,
    /// Any type this client does not know about.
    #[serde(other)]
    Unknown,
}

impl MessageType {
    /// Returns true for messages that carry user-written text.
    pub fn is_text(self) -> bool {
        matches!(
            self,
            Self::TextMessage | Self::PasteMessage | Self::TweetMessage
        )
    }
}

/// A message as delivered by the streaming API and returned by `speak`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMessage {
    /// Message ID.
    pub id: u64,
    /// Room the message belongs to.
    pub room_id: u64,
    /// Author, absent for system messages.
    #[serde(default)]
    pub user_id: Option<u64>,
    /// Text body, absent for most non-text messages.
    #[serde(default)]
    pub body: Option<String>,
    /// Message type.
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Creation time as sent by the service.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Whether the message is starred.
    #[serde(default)]
    pub starred: bool,
}

impl StreamMessage {
    /// Returns true if this message carries user-written text.
    pub fn is_text(&self) -> bool {
        self.kind.is_text()
    }

    /// Returns the body, or an empty string.
    pub fn body(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }
}

/// `{"user": ...}` envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct UserEnvelope {
    pub user: UserRecord,
}

/// `{"rooms": [...]}` envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct RoomsEnvelope {
    pub rooms: Vec<RoomRecord>,
}

/// `{"message": ...}` envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct MessageEnvelope {
    pub message: StreamMessage,
}

/// Body of a `speak` request.
#[derive(Debug, Serialize)]
pub(crate) struct SpeakRequest<'a> {
    pub message: SpeakBody<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SpeakBody<'a> {
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub body: &'a str,
}
