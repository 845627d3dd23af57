// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Waypoint - chat relay for a travel-planning assistant.
//!
//! This is the binary entry point.

mod check;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Waypoint - chat relay for a travel-planning assistant.
#[derive(Parser, Debug)]
#[command(name = "waypoint", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Start the relay server (default).
    Serve,
    /// Validate configuration and probe the database, then exit.
    Check,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let dotenv = match waypoint_config::load_dotenv() {
        Ok(path) => path,
        Err(e) => {
            eprintln!("warning: ignoring unreadable .env file: {e}");
            None
        }
    };

    let loaded = match cli.config.as_deref() {
        Some(path) => waypoint_config::load_and_validate_path(path),
        None => waypoint_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            waypoint_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve::run_serve(config, dotenv).await,
        Commands::Check => check::run_check(&config).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["waypoint"]).unwrap();
        assert_eq!(cli.command, None);
        assert!(cli.config.is_none());
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["waypoint", "check", "--config", "/tmp/w.toml"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Check));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/w.toml")));
    }
}
