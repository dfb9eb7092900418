//! uitest - A scenario-driven browser UI test runner
//!
//! Runs YAML scenarios against a web application through a W3C WebDriver
//! endpoint and reports per-step pass/fail results.

use clap::Parser;
use commands::Commands;
use uitest::common::logging;
use uitest::{cli, commands};

#[derive(Parser)]
#[command(name = "uitest", about = "Scenario-driven browser UI test runner")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // The run command can mirror logs to a file; the appender guard has
    // to outlive the whole run to flush buffered lines
    let (verbose, log_file) = match &cli.command {
        Commands::Run {
            verbose, log_file, ..
        } => (*verbose, log_file.clone()),
        _ => (false, None),
    };

    let log_guard = match log_file {
        Some(path) => match logging::init_with_file(verbose, &path) {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("Error: cannot open log file '{}': {e}", path.display());
                std::process::exit(1);
            }
        },
        None => {
            logging::init_cli(verbose);
            None
        }
    };

    if let Err(e) = cli::dispatch(cli.command).await {
        eprintln!("Error: {e}");
        drop(log_guard);
        std::process::exit(1);
    }
}
