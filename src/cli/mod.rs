//! Command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};

/// ASIT - client and access-key registry service.
#[derive(Parser, Debug)]
#[command(name = "asit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log level filter (overrides RUST_LOG).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the registry HTTP server.
    Serve(commands::ServeArgs),
}
