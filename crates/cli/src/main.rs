// SPDX-License-Identifier: MIT

//! `ghost`: command-line client for `ghostd`, the local process orchestrator.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod color;
mod commands;
mod exit_error;
mod output;

use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};

use commands::daemon::DaemonArgs;
use commands::process::ProcessCommand;
use exit_error::ExitError;
use output::OutputFormat;

/// Ghost — a local process orchestrator
#[derive(Parser)]
#[command(
    name = "ghost",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_GIT_HASH"), ")"),
    about,
    long_about = None
)]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage ghostd itself (start, stop, restart, status, logs)
    Daemon(DaemonArgs),
    #[command(flatten)]
    Process(ProcessCommand),
}

#[tokio::main]
async fn main() {
    let command = Cli::command().styles(color::styles());
    let cli = match Cli::from_arg_matches(&command.get_matches()) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    let result = match cli.command {
        Commands::Daemon(args) => commands::daemon::daemon(args, cli.output).await,
        Commands::Process(command) => commands::process::run(command, cli.output).await,
    };

    if let Err(err) = result {
        match err.downcast::<ExitError>() {
            Ok(exit_err) => {
                eprintln!("{exit_err}");
                std::process::exit(exit_err.code);
            }
            Err(err) => {
                eprintln!("error: {err}");
                std::process::exit(1);
            }
        }
    }
}
