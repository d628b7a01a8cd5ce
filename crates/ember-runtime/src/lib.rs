//! Ember Runtime - orchestration layer for the Ember chat-bot framework.
//!
//! This crate provides:
//! - Layered configuration loading (`ConfigLoader`, `EmberConfig`)
//! - Logging setup (`LoggingBuilder`, `init_from_config`)
//! - Runtime orchestration (`EmberRuntime`): backend construction from its
//!   configuration section, signal handling and message dispatch
//!
//! ```ignore
//! use ember_runtime::EmberRuntime;
//! use ember_adapter_campfire::CampfireBackend;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = EmberRuntime::new();
//!     let backend = runtime.backend_from_config::<CampfireBackend>()?;
//!
//!     // Run until Ctrl+C or until the backend stops
//!     runtime.run(backend).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, EmberConfig, LoggingConfig, Profile};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents, init_from_config};
pub use runtime::{EmberRuntime, RuntimeBuilder, RuntimeHost};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
