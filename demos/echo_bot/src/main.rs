//! Echo Bot
//!
//! A small Campfire bot built on Ember. It joins the first room listed in
//! `chatroom_presence` and answers a few commands:
//!
//! ```text
//! !echo <text>   repeat the text
//! !ping          pong
//! !help          list commands
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package echo-bot -- --config demos/echo_bot/ember.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use ember_adapter_campfire::CampfireBackend;
use ember_core::{EmberContext, Outcome, handler_fn};
use ember_runtime::EmberRuntime;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "echo-bot", about = "A simple echo bot for Campfire")]
struct Args {
    /// Configuration file (defaults to ./ember.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile, e.g. "production"
    #[arg(short, long)]
    profile: Option<String>,
}

const HELP_TEXT: &str = "**Echo Bot**

- `!echo <text>` repeat the text
- `!ping` pong
- `!help` this help";

// ============================================================================
// Handler Functions
// ============================================================================

/// Logs every inbound message.
async fn logging_handler(ctx: Arc<EmberContext>) -> Outcome {
    let message = ctx.message();
    info!(
        "[{}] {}: {}",
        ctx.backend().mode(),
        message.frm_person().unwrap_or("Unknown"),
        message.body
    );
    Outcome::Ignored
}

async fn echo_handler(ctx: Arc<EmberContext>) -> Outcome {
    let Some(content) = ctx.text().strip_prefix("!echo ") else {
        return Outcome::Ignored;
    };
    if let Err(e) = ctx.reply(content).await {
        error!("Failed to send echo reply: {e}");
    }
    ctx.stop_propagation();
    Outcome::Handled
}

async fn ping_handler(ctx: Arc<EmberContext>) -> Outcome {
    if ctx.text().trim() != "!ping" {
        return Outcome::Ignored;
    }
    if let Err(e) = ctx.reply("pong").await {
        error!("Failed to send ping reply: {e}");
    }
    ctx.stop_propagation();
    Outcome::Handled
}

async fn help_handler(ctx: Arc<EmberContext>) -> Outcome {
    if ctx.text().trim() != "!help" {
        return Outcome::Ignored;
    }
    if let Err(e) = ctx.reply(HELP_TEXT).await {
        error!("Failed to send help message: {e}");
    }
    ctx.stop_propagation();
    Outcome::Handled
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = EmberRuntime::builder();
    if let Some(path) = args.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = args.profile {
        builder = builder.profile(profile);
    }

    // Logging runs first and never stops propagation
    let runtime = builder
        .handler(handler_fn("logging", logging_handler))
        .handler(handler_fn("echo", echo_handler))
        .handler(handler_fn("ping", ping_handler))
        .handler(handler_fn("help", help_handler))
        .build()?;

    let backend = runtime.backend_from_config::<CampfireBackend>()?;
    runtime.run(backend).await?;

    Ok(())
}
