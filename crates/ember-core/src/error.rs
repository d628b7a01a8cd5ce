//! Unified error types for the Ember backend contract.
//!
//! Transport errors come from the chat service client, backend errors from
//! the adapter layer built on top of it.

use thiserror::Error;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors that can occur while talking to the chat service.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The request could not be sent or the connection dropped.
    #[error("connection failed: {url} - {reason}")]
    ConnectionFailed {
        /// The URL that failed.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// The service answered with a non-success status.
    #[error("HTTP {status} from {url}: {body}")]
    Http {
        /// The requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// A response or stream payload could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// No room with the given name is visible to the account.
    #[error("room '{name}' not found")]
    RoomNotFound {
        /// The requested room name.
        name: String,
    },

    /// The streaming connection ended.
    #[error("stream closed: {reason}")]
    StreamClosed {
        /// Reason for closure.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl TransportError {
    /// Creates a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Returns true if the service rejected the credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status: 401, .. })
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// Backend Errors
// =============================================================================

/// Errors that can occur in backend operations.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The backend configuration is unusable.
    #[error("invalid backend configuration: {0}")]
    Config(String),

    /// The backend has not connected yet.
    #[error("backend is not connected")]
    NotConnected,

    /// The backend was shut down and cannot be used again.
    #[error("backend has been shut down")]
    ShutDown,

    /// The operation is not supported by this backend.
    #[error("operation '{0}' is not supported by this backend")]
    Unsupported(&'static str),

    /// Transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl BackendError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;
