//! ASIT registry - CLI entrypoint.
//!
//! Usage:
//!   asit serve [--port PORT] [--log-level LEVEL]
//!
//! Configuration comes from the environment; REDIS_ADDRS is required.

use anyhow::Result;
use asit::cli::commands::run_serve;
use asit::cli::{Cli, Commands};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => run_serve(args, cli.log_level).await,
    }
}
