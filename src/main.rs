use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use polystore::adapter::inbound::cli::command::{Cli, Commands};
use polystore::adapter::inbound::cli::output::{self, OutputConfig};
use polystore::adapter::inbound::cli::{check, watch};

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    output::configure(OutputConfig::new(cli.json, cli.quiet));

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Check(args) => {
            check::execute_check(&args.config).context("storage check failed")
        }
        Commands::Watch(args) => watch::execute_watch(&args.config, args.collection.as_deref())
            .context("insert watch failed"),
    }
}
