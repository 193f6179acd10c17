// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parley - a multi-tenant chat relay for LLM providers.
//!
//! Binary entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod serve;

/// Parley - a multi-tenant chat relay for LLM providers.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file (defaults to parley.toml plus
    /// PARLEY_-prefixed environment variables).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the relay server.
    Serve,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => parley_config::load_config_from_path(&path),
        None => parley_config::load_config(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("parley: invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Some(Commands::Serve) | None => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("parley: {e}");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("parley=info,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
