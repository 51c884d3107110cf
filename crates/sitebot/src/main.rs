// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sitebot - website and Telegram AI chat service.
//!
//! Binary entry point. Loads configuration, then dispatches to the
//! requested subcommand.

mod serve;

use clap::{Parser, Subcommand};

/// Sitebot - website and Telegram AI chat service.
#[derive(Parser, Debug)]
#[command(name = "sitebot", version, about, long_about = None)]
struct Cli {
    /// Path to a sitebot.toml configuration file.
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the chat service (embed REST surface + Telegram webhooks).
    Serve,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => sitebot_config::load_config_from_path(path),
        None => sitebot_config::load_config(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("sitebot: configuration error: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("sitebot: {e}");
                std::process::exit(1);
            }
        }
        None => {
            println!("sitebot: use --help for available commands");
        }
    }
}
