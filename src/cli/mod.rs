//! CLI command handling
//!
//! Dispatches CLI commands and formats runner output.

use std::path::PathBuf;
use std::time::Duration;

use colored::Colorize;
use url::Url;

use crate::commands::Commands;
use crate::common::config::{Config, DriverKind};
use crate::common::{paths, Error, Result};
use crate::scenario::{run_scenario, RunContext, Scenario, ScenarioResult};
use crate::webdriver::{DriverHandle, NewSessionRequest, WebDriverClient};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            scenarios,
            base_url,
            webdriver_url,
            driver,
            headless,
            soft,
            verbose,
            // Consumed in main before logging comes up
            log_file: _,
        } => {
            run(
                scenarios,
                base_url,
                webdriver_url,
                driver,
                headless,
                soft,
                verbose,
            )
            .await
        }

        Commands::Check { scenarios } => check(&scenarios),

        Commands::Drivers => drivers(),
    }
}

/// Run scenario files in order against one driver, a fresh browser
/// session per scenario
async fn run(
    scenarios: Vec<PathBuf>,
    base_url: Option<String>,
    webdriver_url: Option<String>,
    driver: Option<String>,
    headless: bool,
    soft: bool,
    verbose: bool,
) -> Result<()> {
    let mut config = Config::load()?;

    // CLI flags override config file values
    if let Some(url) = base_url {
        config.defaults.base_url = Some(url);
    }
    if headless {
        config.defaults.headless = true;
    }
    let driver_name = driver.unwrap_or_else(|| config.defaults.driver.clone());

    let base = config
        .defaults
        .base_url
        .as_deref()
        .map(|raw| {
            Url::parse(raw).map_err(|e| Error::Config(format!("invalid base URL '{raw}': {e}")))
        })
        .transpose()?;

    // The driver name picks the capabilities even when attaching to an
    // endpoint someone else started
    let kind = config
        .drivers
        .get(&driver_name)
        .map(|d| d.kind)
        .unwrap_or_else(|| DriverKind::infer(&driver_name));

    let startup = Duration::from_secs(config.timeouts.driver_startup_secs);

    let handle = match webdriver_url {
        Some(url) => DriverHandle::attach(&url, startup).await?,
        None => {
            let driver_config = config.get_driver(&driver_name).ok_or_else(|| {
                Error::driver_not_found(&driver_name, &search_locations(&driver_name))
            })?;
            DriverHandle::spawn(&driver_name, &driver_config, startup).await?
        }
    };

    let client = WebDriverClient::new(
        handle.endpoint(),
        Duration::from_secs(config.timeouts.navigate_secs),
    )?;

    let capabilities = match kind {
        DriverKind::Chromedriver => NewSessionRequest::chrome(config.defaults.headless),
        DriverKind::Geckodriver => NewSessionRequest::firefox(config.defaults.headless),
        DriverKind::Generic => NewSessionRequest::generic(),
    };

    let ctx = RunContext {
        client,
        capabilities,
        base_url: base,
        timeouts: config.timeouts.clone(),
        soft,
        verbose,
    };

    let mut results = Vec::new();
    for path in &scenarios {
        match run_scenario(&ctx, path).await {
            Ok(result) => results.push(result),
            Err(e) => {
                // No per-step output was produced (unreadable file, the
                // driver refused a session); record it as a failed result
                // so the rest of the suite still runs
                println!("\n{} {}: {}", "✗".red().bold(), path.display(), e);
                results.push(ScenarioResult {
                    name: path.display().to_string(),
                    passed: false,
                    steps_run: 0,
                    steps_total: 0,
                    failures: vec![e.to_string()],
                });
            }
        }
    }

    print_summary(&results);

    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        return Err(Error::Suite {
            failed,
            total: results.len(),
        });
    }
    Ok(())
}

/// Print one line per scenario plus a pass/fail tally
fn print_summary(results: &[ScenarioResult]) {
    println!("{}", "Summary:".cyan());

    for result in results {
        if result.passed {
            println!(
                "  {} {} ({} step{})",
                "✓".green(),
                result.name,
                result.steps_total,
                plural(result.steps_total)
            );
        } else if result.steps_total == 0 {
            println!("  {} {} (did not run)", "✗".red(), result.name);
            for failure in &result.failures {
                println!("      {}", failure.dimmed());
            }
        } else {
            println!(
                "  {} {} ({} failure{}, {}/{} steps run)",
                "✗".red(),
                result.name,
                result.failures.len(),
                plural(result.failures.len()),
                result.steps_run,
                result.steps_total
            );
            for failure in &result.failures {
                println!("      {}", failure.dimmed());
            }
        }
    }

    let failed = results.iter().filter(|r| !r.passed).count();
    let passed = results.len() - failed;
    let tally = format!("{passed} passed, {failed} failed");
    if failed == 0 {
        println!("\n{}", tally.green().bold());
    } else {
        println!("\n{}", tally.red().bold());
    }
}

/// Validate scenario files without touching a browser
fn check(paths: &[PathBuf]) -> Result<()> {
    let mut invalid = 0;

    for path in paths {
        match Scenario::load(path) {
            Ok(scenario) => {
                println!(
                    "{} {}: '{}' ({} step{})",
                    "✓".green(),
                    path.display(),
                    scenario.name,
                    scenario.steps.len(),
                    plural(scenario.steps.len())
                );
            }
            Err(e) => {
                invalid += 1;
                println!("{} {}: {}", "✗".red(), path.display(), e);
            }
        }
    }

    if invalid > 0 {
        return Err(Error::Suite {
            failed: invalid,
            total: paths.len(),
        });
    }
    Ok(())
}

/// Show which WebDriver binaries are configured and resolvable
fn drivers() -> Result<()> {
    let config = Config::load()?;

    let mut names = vec!["chromedriver".to_string(), "geckodriver".to_string()];
    for name in config.drivers.keys() {
        if !names.iter().any(|n| n == name) {
            names.push(name.clone());
        }
    }
    names.sort();

    println!("Drivers:");
    for name in &names {
        let default = if *name == config.defaults.driver {
            " (default)"
        } else {
            ""
        };

        match config.get_driver(name) {
            Some(driver) => {
                let source = if config.drivers.contains_key(name) {
                    "configured"
                } else {
                    "found in PATH"
                };
                println!(
                    "  {} {:<14} {} [{}]{}",
                    "✓".green(),
                    name,
                    driver.path.display(),
                    source,
                    default.dimmed()
                );
            }
            None => {
                println!("  {} {:<14} not found{}", "✗".red(), name, default.dimmed());
            }
        }
    }

    Ok(())
}

/// Where a driver binary was looked for, for the not-found message
fn search_locations(name: &str) -> Vec<String> {
    let mut searched = Vec::new();
    if let Some(path) = paths::config_path() {
        searched.push(format!("[drivers.{name}] in {}", path.display()));
    }
    searched.push(format!("$PATH (as '{name}')"));
    searched
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
