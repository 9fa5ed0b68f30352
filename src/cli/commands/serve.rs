//! Serve command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use crate::api::server::{serve, AppState};
use crate::core::config::Config;
use crate::registry::repository::ClientRepository;
use crate::storage::{RedisStore, Storage};

/// Start the registry HTTP server.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Listen port override.
    #[arg(long)]
    pub port: Option<u16>,
}

/// Initialize the tracing subscriber.
fn init_tracing(level: Option<&str>) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

/// Run the serve command.
pub async fn run_serve(args: ServeArgs, log_level: Option<String>) -> Result<()> {
    init_tracing(log_level.as_deref());

    let mut config = Config::from_env().context("failed to load configuration")?;
    if let Some(port) = args.port {
        config.http.port = port;
    }

    tracing::info!(addrs = ?config.redis.addrs, "connecting to the key-value store");
    let store = RedisStore::connect(&config.redis)
        .await
        .context("failed to connect to the key-value store")?;
    let storage = Storage::new(Arc::new(store));
    let repository = Arc::new(ClientRepository::new(storage));

    let state = AppState {
        repository,
        revision: config.revision.clone(),
    };
    serve(&config, state).await
}
