//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Operator tool for the storage layer.
#[derive(Parser, Debug)]
#[command(name = "polystore")]
#[command(version)]
pub struct Cli {
    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the configured backend and run its health check
    Check(ConfigPathArg),

    /// Print documents inserted into a collection until interrupted
    Watch(WatchArgs),
}

/// Shared argument for commands that only need a config path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,
}

/// Arguments for the `watch` subcommand.
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Collection to watch; defaults to `storage.mongo.collection`
    #[arg(long)]
    pub collection: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_check_with_default_config() {
        let cli = Cli::try_parse_from(["polystore", "check"]).unwrap();
        match cli.command {
            Commands::Check(args) => assert_eq!(args.config, PathBuf::from("config.toml")),
            Commands::Watch(_) => panic!("expected check"),
        }
    }

    #[test]
    fn parses_watch_with_collection() {
        let cli = Cli::try_parse_from([
            "polystore",
            "--json",
            "watch",
            "-c",
            "store.toml",
            "--collection",
            "news",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Commands::Watch(args) => {
                assert_eq!(args.config, PathBuf::from("store.toml"));
                assert_eq!(args.collection.as_deref(), Some("news"));
            }
            Commands::Check(_) => panic!("expected watch"),
        }
    }

    #[test]
    fn command_is_required() {
        assert!(Cli::try_parse_from(["polystore"]).is_err());
    }
}
