//! taskdeck - a command-line client for the taskdeck task backend.
//!
//! The bearer credential lives in the OS keychain, or in a file when the
//! config asks for it.

mod cli;
mod commands;
mod format;

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use taskdeck_core::{ApiClient, Config, SessionController};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Command};
use commands::App;

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr so they never mix with command output. Use RUST_LOG
/// to raise the level (e.g. RUST_LOG=taskdeck_core=debug).
fn init_tracing() -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (writer, guard) = tracing_appender::non_blocking(io::stderr());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_target(false))
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing();

    let config = Config::load().context("Failed to load configuration")?;
    let tokens = Arc::new(config.token_store()?);
    let api = match cli.api_url.as_deref() {
        Some(url) => ApiClient::with_timeout(url, tokens, config.request_timeout())
            .context("Failed to build HTTP client")?,
        None => config.api_client(tokens)?,
    };
    info!(base_url = %api.base_url(), "Starting");

    let session = SessionController::new(api);
    let mut app = App::new(config, session);

    // Signing in replaces the stored credential and signing out never
    // contacts the backend, so neither needs the startup check.
    if !matches!(
        cli.command,
        Command::Login { .. } | Command::Register { .. } | Command::Logout
    ) {
        let status = app.session.check_status().await;
        info!(?status, "Session checked");
    }

    match cli.command {
        Command::Login { email } => app.login(email).await,
        Command::Register { email, name } => app.register(email, name).await,
        Command::Logout => {
            app.logout();
            Ok(())
        }
        Command::Whoami => {
            app.whoami();
            Ok(())
        }
        Command::List { filter } => app.list(filter).await,
        Command::Add {
            title,
            description,
            due,
        } => app.add(title, description, due).await,
        Command::Edit {
            id,
            title,
            description,
            due,
        } => app.edit(id, title, description, due).await,
        Command::Done { id } => app.set_completed(id, true).await,
        Command::Undo { id } => app.set_completed(id, false).await,
        Command::Rm { id, yes } => app.remove(id, yes).await,
        Command::Calendar { month } => app.calendar(month).await,
        Command::Upcoming { limit } => app.upcoming(limit).await,
    }
}
