//! Configuration types for the Campfire adapter.
//!
//! The adapter reads its section of the global `ember.toml`:
//!
//! ```toml
//! [adapters.campfire]
//! chatroom_presence = ["Lobby"]
//! compact_output = false
//! serve_mode = "until-error"   # or "poll"
//! poll_interval_ms = 1000
//!
//! [adapters.campfire.bot_identity]
//! subdomain = "acme"
//! username = "bot@acme.com"
//! ssl = true
//! ```
//!
//! Values are taken literally; there is no `${VAR}` expansion. Keep the
//! password out of the file and set it through the environment instead:
//! `EMBER_ADAPTERS__CAMPFIRE__BOT_IDENTITY__PASSWORD`. Every other key can
//! be overridden the same way.

use std::time::Duration;

use ember_core::{BackendError, BackendResult};
use ember_transport::ClientConfig;
use serde::{Deserialize, Serialize};

/// Campfire adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CampfireConfig {
    /// Account and login.
    pub bot_identity: BotIdentity,

    /// Rooms to be present in. The first one is the default room.
    pub chatroom_presence: Vec<String>,

    /// Compact output flag. Stored for handlers; the adapter does not use it.
    pub compact_output: bool,

    /// How `serve_forever` reacts to stream failures.
    pub serve_mode: ServeMode,

    /// Liveness check interval in [`ServeMode::Poll`].
    pub poll_interval_ms: u64,

    /// REST endpoint override, mostly for tests and proxies.
    pub base_url: Option<String>,

    /// Streaming endpoint override.
    pub streaming_url: Option<String>,

    /// Timeout for REST calls in milliseconds.
    pub timeout_ms: u64,
}

impl Default for CampfireConfig {
    fn default() -> Self {
        Self {
            bot_identity: BotIdentity::default(),
            chatroom_presence: Vec::new(),
            compact_output: false,
            serve_mode: ServeMode::default(),
            poll_interval_ms: 1000,
            base_url: None,
            streaming_url: None,
            timeout_ms: 30_000,
        }
    }
}

impl CampfireConfig {
    /// Checks the settings `connect` depends on.
    pub fn validate(&self) -> BackendResult<()> {
        if self.default_room().is_none() {
            return Err(BackendError::config(
                "the bot needs to join at least one room; set chatroom_presence \
                 with at least one room name",
            ));
        }
        if self.bot_identity.username.is_empty() {
            return Err(BackendError::config("bot_identity.username is required"));
        }
        if self.bot_identity.subdomain.is_empty() && self.base_url.is_none() {
            return Err(BackendError::config(
                "bot_identity.subdomain is required unless base_url is set",
            ));
        }
        if self.serve_mode == ServeMode::Poll && self.poll_interval_ms == 0 {
            return Err(BackendError::config("poll_interval_ms must be positive"));
        }
        Ok(())
    }

    /// Returns the first non-blank entry of `chatroom_presence`.
    pub fn default_room(&self) -> Option<&str> {
        self.chatroom_presence
            .first()
            .map(|room| room.trim())
            .filter(|room| !room.is_empty())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Builds the client settings.
    pub fn client_config(&self) -> ClientConfig {
        let identity = &self.bot_identity;
        let mut config = ClientConfig::new(
            identity.subdomain.as_str(),
            identity.username.as_str(),
            identity.password.as_str(),
        )
        .with_ssl(identity.ssl)
        .with_timeout(Duration::from_millis(self.timeout_ms));

        if let Some(url) = &self.base_url {
            config = config.with_base_url(url.as_str());
        }
        if let Some(url) = &self.streaming_url {
            config = config.with_streaming_url(url.as_str());
        }
        config
    }
}

/// Account credentials.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotIdentity {
    /// Account subdomain (`<subdomain>.campfirenow.com`).
    pub subdomain: String,
    /// Login name.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Whether to use HTTPS (default: true).
    pub ssl: bool,
}

impl Default for BotIdentity {
    fn default() -> Self {
        Self {
            subdomain: String::new(),
            username: String::new(),
            password: String::new(),
            ssl: true,
        }
    }
}

impl std::fmt::Debug for BotIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotIdentity")
            .field("subdomain", &self.subdomain)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("ssl", &self.ssl)
            .finish()
    }
}

/// What `serve_forever` does when a room stream fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServeMode {
    /// Stop serving on the first stream error.
    #[default]
    UntilError,
    /// Keep serving, checking the default room's stream periodically and
    /// logging when it is down.
    Poll,
}
