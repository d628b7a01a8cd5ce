//! Runtime orchestration.
//!
//! The runtime owns the configuration and the handler dispatcher, builds the
//! backend from its configuration section and serves it until Ctrl+C,
//! SIGTERM or the backend stopping on its own.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use ember_runtime::EmberRuntime;
//! use ember_adapter_campfire::CampfireBackend;
//!
//! let mut runtime = EmberRuntime::new();
//! runtime.add_handler(handler_fn("ping", ping));
//!
//! let backend = runtime.backend_from_config::<CampfireBackend>()?;
//! runtime.run(backend).await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

use crate::config::{ConfigLoader, ConfigResult, EmberConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use ember_core::{
    BotHost, BoxedBackend, BoxedHandler, ConfigurableBackend, Dispatcher, Message, same_person,
};

/// The main Ember runtime.
///
/// # Custom Configuration
///
/// ```rust,ignore
/// let runtime = EmberRuntime::builder()
///     .config_file("config/ember.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct EmberRuntime {
    /// The configuration.
    config: EmberConfig,
    /// Handlers receiving inbound messages.
    dispatcher: Dispatcher,
}

impl EmberRuntime {
    /// Creates a new runtime, loading `ember.toml` from the current directory.
    ///
    /// If the configuration cannot be loaded, default settings are used.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                EmberConfig::default()
            });

        Self::from_config(&config)
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a new runtime from configuration and initializes logging.
    pub fn from_config(config: &EmberConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            adapters = config.adapters.len(),
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            dispatcher: Dispatcher::new(),
        }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &EmberConfig {
        &self.config
    }

    /// Registers a handler. Handlers run in registration order.
    pub fn add_handler(&mut self, handler: BoxedHandler) {
        self.dispatcher.add(handler);
    }

    /// Registers a handler (builder pattern).
    pub fn with_handler(mut self, handler: BoxedHandler) -> Self {
        self.add_handler(handler);
        self
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.dispatcher.handler_count()
    }

    /// Creates a backend from its configuration section.
    ///
    /// The section `adapters.<B::name()>` is deserialized into `B::Config`;
    /// when it is absent the default configuration is used.
    ///
    /// ```rust,ignore
    /// let backend = runtime.backend_from_config::<CampfireBackend>()?;
    /// ```
    pub fn backend_from_config<B>(&self) -> RuntimeResult<Arc<B>>
    where
        B: ConfigurableBackend + 'static,
    {
        let name = B::name();

        let config: B::Config = match self.config.adapters.get(name) {
            Some(value) => value.deserialize().map_err(|e| {
                RuntimeError::AdapterConfigDeserialize(format!(
                    "Failed to deserialize config for adapter '{name}': {e}"
                ))
            })?,
            None => {
                warn!(
                    adapter = name,
                    "No configuration found for adapter, using default"
                );
                Default::default()
            }
        };

        let backend = B::from_config(config)?;
        info!(adapter = name, "Backend created");
        Ok(backend)
    }

    /// Serves `backend` until Ctrl+C, SIGTERM or the backend stops.
    pub async fn run(&self, backend: BoxedBackend) -> RuntimeResult<()> {
        let shutdown = CancellationToken::new();
        let watcher = tokio::spawn(wait_for_shutdown(shutdown.clone()));

        info!("Ember runtime is now running. Press Ctrl+C to stop.");
        let result = self.run_until_cancelled(backend, shutdown).await;

        watcher.abort();
        result
    }

    /// Serves `backend` until `shutdown` is cancelled or the backend stops.
    pub async fn run_until_cancelled(
        &self,
        backend: BoxedBackend,
        shutdown: CancellationToken,
    ) -> RuntimeResult<()> {
        let mode = backend.mode();
        let host = Arc::new(RuntimeHost::new(
            Arc::clone(&backend),
            self.dispatcher.clone(),
        ));

        let result = backend.serve_forever(host, shutdown).await;
        match &result {
            Ok(()) => info!(mode, "Runtime stopped"),
            Err(e) => warn!(mode, error = %e, "Backend stopped with an error"),
        }
        result.map_err(RuntimeError::from)
    }
}

impl Default for EmberRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for Ctrl+C or SIGTERM, then cancels `shutdown`.
async fn wait_for_shutdown(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c() => {
                        info!("Received Ctrl+C, shutting down");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                ctrl_c().await;
                info!("Received Ctrl+C, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await;
        info!("Received Ctrl+C, shutting down");
    }

    shutdown.cancel();
}

/// Resolves on Ctrl+C; never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

// =============================================================================
// RuntimeHost
// =============================================================================

/// The host handed to the backend: filters the bot's own messages and
/// dispatches the rest to the handlers.
pub struct RuntimeHost {
    backend: BoxedBackend,
    dispatcher: Dispatcher,
}

impl RuntimeHost {
    pub fn new(backend: BoxedBackend, dispatcher: Dispatcher) -> Self {
        Self {
            backend,
            dispatcher,
        }
    }

    fn is_own_message(&self, message: &Message) -> bool {
        match (self.backend.bot_identifier(), message.frm.as_deref()) {
            (Some(bot), Some(frm)) => same_person(bot.as_ref(), frm),
            _ => false,
        }
    }
}

#[async_trait]
impl BotHost for RuntimeHost {
    async fn callback_message(&self, message: Message) {
        if self.is_own_message(&message) {
            trace!(body = %message.body, "Ignoring message sent by the bot itself");
            return;
        }
        self.dispatcher
            .dispatch(message, Arc::clone(&self.backend))
            .await;
    }

    async fn connect_callback(&self) {
        info!(mode = self.backend.mode(), "Backend connected");
    }

    async fn disconnect_callback(&self) {
        info!(mode = self.backend.mode(), "Backend disconnected");
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating an `EmberRuntime` with custom configuration.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    handlers: Vec<BoxedHandler>,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder searching the current directory.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            handlers: Vec::new(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Enables loading environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: EmberConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Sets a single configuration key programmatically.
    pub fn set<V: serde::Serialize>(mut self, key: &str, value: V) -> Self {
        self.config_loader = self.config_loader.set(key, value);
        self
    }

    /// Registers a handler on the built runtime.
    pub fn handler(mut self, handler: BoxedHandler) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> ConfigResult<EmberRuntime> {
        let config = self.config_loader.load()?;
        let mut runtime = EmberRuntime::from_config(&config);
        for handler in self.handlers {
            runtime.add_handler(handler);
        }
        Ok(runtime)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
