//! Scenario runner
//!
//! Executes a scenario step by step against a fresh browser session,
//! printing a ✓/✗ line per step. Failures abort the remaining steps of
//! the scenario (soft mode excepts assertion steps), never the suite.

use std::path::Path;
use std::time::Duration;

use colored::Colorize;
use tracing::warn;
use url::Url;

use crate::common::config::Timeouts;
use crate::common::{Error, Result};
use crate::session::{Locator, Session, WaitCondition};
use crate::webdriver::{NewSessionRequest, WebDriverClient};

use super::config::{Scenario, Step, WaitState};

/// Everything a scenario run needs besides the scenario itself
pub struct RunContext {
    /// Client for the driver endpoint
    pub client: WebDriverClient,
    /// Capabilities each fresh session is opened with
    pub capabilities: NewSessionRequest,
    /// Base URL relative navigation targets resolve against
    pub base_url: Option<Url>,
    /// Find/poll timing
    pub timeouts: Timeouts,
    /// Record assertion failures and continue instead of aborting
    pub soft: bool,
    /// Print extra detail per step
    pub verbose: bool,
}

/// Result of one scenario run
#[derive(Debug)]
pub struct ScenarioResult {
    pub name: String,
    pub passed: bool,
    pub steps_run: usize,
    pub steps_total: usize,
    pub failures: Vec<String>,
}

/// Run a scenario from a YAML file against a fresh session
pub async fn run_scenario(ctx: &RunContext, path: &Path) -> Result<ScenarioResult> {
    let scenario = Scenario::load(path)?;
    let steps_total = scenario.steps.len();

    println!(
        "\n{} {}",
        "Running Scenario:".blue().bold(),
        scenario.name.white().bold()
    );

    if let Some(desc) = &scenario.description {
        println!("  {}", desc.dimmed());
    }

    // Fresh session per scenario: cookies and storage cannot leak between runs
    let session = Session::open(
        ctx.client.clone(),
        &ctx.capabilities,
        ctx.base_url.clone(),
        ctx.timeouts.clone(),
    )
    .await?;

    if ctx.verbose {
        println!("  {}", format!("session {}", session.id()).dimmed());
    }

    println!("\n{}", "Steps:".cyan());

    let mut failures = Vec::new();
    let mut steps_run = 0;

    for (i, step) in scenario.steps.iter().enumerate() {
        let step_num = i + 1;
        steps_run = step_num;

        match execute_step(&session, step, &ctx.timeouts).await {
            Ok(()) => {
                println!(
                    "  {} Step {}: {}",
                    "✓".green(),
                    step_num,
                    step.describe().dimmed()
                );
            }
            Err(e) => {
                println!("  {} Step {}: {}", "✗".red(), step_num, e);
                failures.push(format!("step {} ({}): {}", step_num, step.describe(), e));

                // In soft mode a failed assertion still lets the rest of
                // the scenario run; interactions always abort.
                if !(ctx.soft && step.is_assertion()) {
                    break;
                }
            }
        }
    }

    // Teardown runs pass or fail so the next scenario starts clean
    if let Err(e) = session.close().await {
        warn!("failed to close session: {e}");
    }

    let passed = failures.is_empty();
    if passed {
        println!(
            "\n{} {}\n",
            "✓".green().bold(),
            "Scenario Passed".green().bold()
        );
    } else {
        let summary = format!(
            "Scenario Failed ({} failure{})",
            failures.len(),
            if failures.len() == 1 { "" } else { "s" }
        );
        println!("\n{} {}\n", "✗".red().bold(), summary.red().bold());
    }

    Ok(ScenarioResult {
        name: scenario.name,
        passed,
        steps_run,
        steps_total,
        failures,
    })
}

/// Execute a single step against the session
async fn execute_step(session: &Session, step: &Step, timeouts: &Timeouts) -> Result<()> {
    match step {
        Step::Navigate { path } => session.navigate(path).await,
        Step::Find {
            selector,
            pierce,
            index,
        } => {
            let locator = Locator {
                selector: selector.clone(),
                pierce: *pierce,
                index: *index,
            };
            session.locate(&locator).await.map(|_| ())
        }
        Step::Type {
            selector,
            pierce,
            index,
            text,
            enter,
        } => {
            let locator = Locator {
                selector: selector.clone(),
                pierce: *pierce,
                index: *index,
            };
            session.type_text(&locator, text, *enter).await
        }
        Step::Click {
            selector,
            pierce,
            index,
            force,
        } => {
            let locator = Locator {
                selector: selector.clone(),
                pierce: *pierce,
                index: *index,
            };
            session.click(&locator, *force).await
        }
        Step::AssertText { contains } => session.assert_text_contains(contains).await,
        Step::AssertUrl { contains } => session.assert_url_contains(contains).await,
        Step::WaitFor {
            selector,
            text,
            pierce,
            state,
            timeout_ms,
        } => {
            let condition = wait_condition(selector.as_deref(), text.as_deref(), *pierce, *state)
                .ok_or_else(|| {
                    Error::Internal("wait_for without a target survived validation".to_string())
                })?;
            session
                .wait_until(&condition, timeout_ms.unwrap_or(timeouts.find_ms))
                .await
        }
        Step::Pause { ms } => {
            warn!(
                "fixed pause of {ms} ms; a wait_for step observes readiness instead of assuming it"
            );
            tokio::time::sleep(Duration::from_millis(*ms)).await;
            Ok(())
        }
    }
}

/// Build the wait condition a wait_for step describes
fn wait_condition(
    selector: Option<&str>,
    text: Option<&str>,
    pierce: bool,
    state: WaitState,
) -> Option<WaitCondition> {
    if let Some(selector) = selector {
        let locator = Locator {
            selector: selector.to_string(),
            pierce,
            index: None,
        };
        return Some(match state {
            WaitState::Visible => WaitCondition::SelectorVisible(locator),
            WaitState::Gone => WaitCondition::SelectorGone(locator),
        });
    }
    text.map(|text| match state {
        WaitState::Visible => WaitCondition::TextVisible(text.to_string()),
        WaitState::Gone => WaitCondition::TextGone(text.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_condition_from_selector() {
        let cond = wait_condition(Some("#wo-title"), None, false, WaitState::Visible).unwrap();
        assert_eq!(
            cond,
            WaitCondition::SelectorVisible(Locator::css("#wo-title"))
        );

        let cond = wait_condition(Some("#overlay"), None, true, WaitState::Gone).unwrap();
        assert_eq!(
            cond,
            WaitCondition::SelectorGone(Locator::css("#overlay").pierced())
        );
    }

    #[test]
    fn test_wait_condition_from_text() {
        let cond = wait_condition(None, Some("Work order created"), false, WaitState::Visible)
            .unwrap();
        assert_eq!(
            cond,
            WaitCondition::TextVisible("Work order created".to_string())
        );
    }

    #[test]
    fn test_wait_condition_selector_wins_over_text() {
        // Validation rejects this shape; if it slips through, the
        // selector is what gets watched.
        let cond = wait_condition(Some("#a"), Some("b"), false, WaitState::Visible).unwrap();
        assert!(matches!(cond, WaitCondition::SelectorVisible(_)));
    }

    #[test]
    fn test_wait_condition_empty() {
        assert!(wait_condition(None, None, false, WaitState::Visible).is_none());
    }
}
