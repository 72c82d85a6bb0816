//! `labwatch`: polls patient lab report pages and archives every change.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;
mod config;
mod logging;

#[derive(Debug, Parser)]
#[command(name = "labwatch", version)]
#[command(about = "Watch lab report pages, archive changes and report differences", long_about = None)]
struct Cli {
    /// Also write log output to this file
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Poll every configured target until interrupted
    Monitor(commands::monitor::MonitorArgs),
    /// Compare two structured records and print a change report
    Diff(commands::diff::DiffArgs),
    /// Convert a lab report page (file or URL) into record JSON
    Extract(commands::extract::ExtractArgs),
    /// List (and optionally verify) a target's archived snapshots
    History(commands::history::HistoryArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize(cli.verbose, cli.log_file.as_deref());

    let result = match cli.command {
        Commands::Monitor(args) => commands::monitor::execute(args).await,
        Commands::Diff(args) => commands::diff::execute(args),
        Commands::Extract(args) => commands::extract::execute(args).await,
        Commands::History(args) => commands::history::execute(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
