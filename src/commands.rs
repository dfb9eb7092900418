//! CLI command definitions
//!
//! Defines the clap commands for the uitest CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run scenario files against a browser
    #[command(alias = "r")]
    Run {
        /// Scenario files to run, in order
        #[arg(required = true)]
        scenarios: Vec<PathBuf>,

        /// Base URL that relative scenario paths resolve against
        #[arg(long)]
        base_url: Option<String>,

        /// Attach to an already-running WebDriver endpoint instead of
        /// spawning a driver
        #[arg(long)]
        webdriver_url: Option<String>,

        /// Driver to spawn: chromedriver, geckodriver, or a name from
        /// the config file (default: chromedriver)
        #[arg(long)]
        driver: Option<String>,

        /// Run the browser headless even if the config says otherwise
        #[arg(long)]
        headless: bool,

        /// Continue a scenario past failed assertions instead of
        /// aborting at the first one
        #[arg(long)]
        soft: bool,

        /// Print session ids and other per-step detail
        #[arg(long, short)]
        verbose: bool,

        /// Append structured logs to this file
        #[arg(long)]
        log_file: Option<PathBuf>,
    },

    /// Validate scenario files without touching a browser
    Check {
        /// Scenario files to validate
        #[arg(required = true)]
        scenarios: Vec<PathBuf>,
    },

    /// Show which WebDriver binaries are configured and resolvable
    Drivers,
}
