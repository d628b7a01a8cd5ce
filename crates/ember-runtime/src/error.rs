//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend configuration deserialization failed.
    #[error("Failed to deserialize adapter config: {0}")]
    AdapterConfigDeserialize(String),

    /// Backend error.
    #[error("Backend error: {0}")]
    Backend(#[from] ember_core::BackendError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
