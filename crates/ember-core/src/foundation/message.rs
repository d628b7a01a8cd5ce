//! Message type shared by all backends.
//!
//! A [`Message`] is a text body plus optional sender and recipient
//! identifiers. Backends build them from wire events and the framework builds
//! them for replies.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::identifier::BoxedIdentifier;

/// Where a message lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// One-to-one conversation.
    Chat,
    /// Shared room.
    #[default]
    Groupchat,
}

/// A chat message.
#[derive(Clone, Default)]
pub struct Message {
    /// The text body.
    pub body: String,
    /// The sender.
    pub frm: Option<BoxedIdentifier>,
    /// The recipient.
    pub to: Option<BoxedIdentifier>,
    /// Message kind.
    pub kind: MessageKind,
}

impl Message {
    /// Creates a group chat message with the given body.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Default::default()
        }
    }

    /// Sets the sender.
    pub fn with_frm(mut self, frm: BoxedIdentifier) -> Self {
        self.frm = Some(frm);
        self
    }

    /// Sets the recipient.
    pub fn with_to(mut self, to: BoxedIdentifier) -> Self {
        self.to = Some(to);
        self
    }

    /// Sets the kind.
    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    /// Returns the sender's person handle, if any.
    pub fn frm_person(&self) -> Option<&str> {
        self.frm.as_deref().map(|frm| frm.person())
    }

    /// Returns the recipient's person handle, if any.
    pub fn to_person(&self) -> Option<&str> {
        self.to.as_deref().map(|to| to.person())
    }

    /// Returns true for group chat messages.
    pub fn is_group(&self) -> bool {
        self.kind == MessageKind::Groupchat
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("body", &self.body)
            .field("frm", &self.frm_person())
            .field("to", &self.to_person())
            .field("kind", &self.kind)
            .finish()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}: {}",
            self.frm_person().unwrap_or("?"),
            self.to_person().unwrap_or("?"),
            self.body
        )
    }
}
