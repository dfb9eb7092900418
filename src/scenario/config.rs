//! Scenario configuration types
//!
//! Defines the data structures for deserializing YAML scenarios and the
//! validation the `check` command runs before anything touches a browser.

use std::path::Path;

use serde::Deserialize;

use crate::common::{Error, Result};
use crate::session::Locator;

/// A complete scenario loaded from a YAML file
#[derive(Deserialize, Debug)]
pub struct Scenario {
    /// Name of the scenario
    pub name: String,
    /// Optional description of what the scenario verifies
    pub description: Option<String>,
    /// The sequence of steps to execute, in declaration order
    pub steps: Vec<Step>,
}

/// Element state a wait step polls for
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    /// Present and displayed
    #[default]
    Visible,
    /// No longer present
    Gone,
}

/// A single step in the execution flow
#[derive(Deserialize, Debug)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Load a URL (relative paths resolve against the base URL)
    Navigate {
        /// Path or absolute URL
        path: String,
    },
    /// Resolve an element, failing the step if nothing matches in time
    Find {
        /// CSS selector
        selector: String,
        /// Search open shadow roots too
        #[serde(default)]
        pierce: bool,
        /// Zero-based index into the match list
        #[serde(default)]
        index: Option<usize>,
    },
    /// Send keystrokes to an element
    Type {
        /// CSS selector
        selector: String,
        #[serde(default)]
        pierce: bool,
        #[serde(default)]
        index: Option<usize>,
        /// Text to type
        text: String,
        /// Press Enter after the text (submits the enclosing form)
        #[serde(default)]
        enter: bool,
    },
    /// Click an element
    Click {
        /// CSS selector
        selector: String,
        #[serde(default)]
        pierce: bool,
        #[serde(default)]
        index: Option<usize>,
        /// Click from script, bypassing visibility/overlap checks
        #[serde(default)]
        force: bool,
    },
    /// Assert the page's visible text contains a string
    AssertText {
        /// Substring that must appear
        contains: String,
    },
    /// Assert the current URL contains a string
    AssertUrl {
        /// Substring that must appear
        contains: String,
    },
    /// Block until a readiness condition holds
    WaitFor {
        /// CSS selector to watch (exclusive with `text`)
        #[serde(default)]
        selector: Option<String>,
        /// Page text to watch (exclusive with `selector`)
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        pierce: bool,
        /// Target state, `visible` or `gone`
        #[serde(default)]
        state: WaitState,
        /// Override of the default wait timeout
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    /// Fixed sleep. Runs with a warning: prefer `wait_for`, which
    /// observes readiness instead of assuming it.
    Pause {
        /// Milliseconds to sleep
        ms: u64,
    },
}

impl Step {
    /// The locator this step resolves, if it targets an element
    pub fn locator(&self) -> Option<Locator> {
        match self {
            Step::Find {
                selector,
                pierce,
                index,
            }
            | Step::Type {
                selector,
                pierce,
                index,
                ..
            }
            | Step::Click {
                selector,
                pierce,
                index,
                ..
            } => Some(Locator {
                selector: selector.clone(),
                pierce: *pierce,
                index: *index,
            }),
            Step::WaitFor {
                selector: Some(selector),
                pierce,
                ..
            } => Some(Locator {
                selector: selector.clone(),
                pierce: *pierce,
                index: None,
            }),
            _ => None,
        }
    }

    /// Whether a failure of this step is an assertion rather than a
    /// failed interaction. Soft mode only continues past assertions.
    pub fn is_assertion(&self) -> bool {
        matches!(
            self,
            Step::Find { .. } | Step::AssertText { .. } | Step::AssertUrl { .. }
        )
    }

    /// Short human-readable form for the per-step report line
    pub fn describe(&self) -> String {
        match self {
            Step::Navigate { path } => format!("navigate {path}"),
            Step::Find { .. } => format!(
                "find {}",
                self.locator().map(|l| l.to_string()).unwrap_or_default()
            ),
            Step::Type { text, enter, .. } => {
                let locator = self.locator().map(|l| l.to_string()).unwrap_or_default();
                if *enter {
                    format!("type '{text}' + Enter into {locator}")
                } else {
                    format!("type '{text}' into {locator}")
                }
            }
            Step::Click { force, .. } => {
                let locator = self.locator().map(|l| l.to_string()).unwrap_or_default();
                if *force {
                    format!("click {locator} (forced)")
                } else {
                    format!("click {locator}")
                }
            }
            Step::AssertText { contains } => format!("assert text contains '{contains}'"),
            Step::AssertUrl { contains } => format!("assert URL contains '{contains}'"),
            Step::WaitFor {
                selector,
                text,
                state,
                ..
            } => {
                let what = selector
                    .clone()
                    .or_else(|| text.as_ref().map(|t| format!("text '{t}'")))
                    .unwrap_or_default();
                match state {
                    WaitState::Visible => format!("wait for {what} visible"),
                    WaitState::Gone => format!("wait for {what} gone"),
                }
            }
            Step::Pause { ms } => format!("pause {ms} ms"),
        }
    }
}

impl Scenario {
    /// Load and validate a scenario from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        let scenario: Scenario =
            serde_yaml::from_str(&content).map_err(|e| Error::scenario_parse(path, e))?;

        let problems = scenario.validate();
        if !problems.is_empty() {
            return Err(Error::scenario_parse(path, problems.join("; ")));
        }

        Ok(scenario)
    }

    /// Semantic checks the deserializer cannot express
    ///
    /// Returns one message per problem, numbered by step.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.steps.is_empty() {
            problems.push("scenario has no steps".to_string());
        }

        for (i, step) in self.steps.iter().enumerate() {
            let step_num = i + 1;
            match step {
                Step::Navigate { path } if path.is_empty() => {
                    problems.push(format!("step {step_num}: navigate path is empty"));
                }
                Step::Find { selector, .. }
                | Step::Type { selector, .. }
                | Step::Click { selector, .. }
                    if selector.is_empty() =>
                {
                    problems.push(format!("step {step_num}: selector is empty"));
                }
                Step::AssertText { contains } | Step::AssertUrl { contains }
                    if contains.is_empty() =>
                {
                    problems.push(format!("step {step_num}: assertion string is empty"));
                }
                Step::WaitFor { selector, text, .. } => {
                    match (selector, text) {
                        (Some(_), Some(_)) => problems.push(format!(
                            "step {step_num}: wait_for takes either 'selector' or 'text', not both"
                        )),
                        (None, None) => problems.push(format!(
                            "step {step_num}: wait_for needs a 'selector' or 'text' to watch"
                        )),
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Scenario {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_parse_portal_login_steps() {
        let scenario = parse(
            r#"
name: portal login
description: sign in and land on the dashboard
steps:
  - action: navigate
    path: /
  - action: type
    selector: input[slot="input"]
    pierce: true
    index: 0
    text: test
  - action: type
    selector: input[slot="input"]
    pierce: true
    index: 1
    text: test
    enter: true
  - action: assert_url
    contains: /app
  - action: assert_text
    contains: Dashboard
"#,
        );

        assert_eq!(scenario.name, "portal login");
        assert_eq!(scenario.steps.len(), 5);
        match &scenario.steps[2] {
            Step::Type {
                pierce,
                index,
                enter,
                text,
                ..
            } => {
                assert!(*pierce);
                assert_eq!(*index, Some(1));
                assert!(*enter);
                assert_eq!(text, "test");
            }
            other => panic!("expected type step, got {other:?}"),
        }
        assert!(scenario.validate().is_empty());
    }

    #[test]
    fn test_parse_wait_for_defaults() {
        let scenario = parse(
            r##"
name: wait
steps:
  - action: wait_for
    selector: "#wo-title"
"##,
        );
        match &scenario.steps[0] {
            Step::WaitFor {
                selector,
                text,
                state,
                timeout_ms,
                ..
            } => {
                assert_eq!(selector.as_deref(), Some("#wo-title"));
                assert!(text.is_none());
                assert_eq!(*state, WaitState::Visible);
                assert!(timeout_ms.is_none());
            }
            other => panic!("expected wait_for step, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_ambiguous_wait() {
        let scenario = parse(
            r##"
name: bad wait
steps:
  - action: wait_for
    selector: "#a"
    text: also this
"##,
        );
        let problems = scenario.validate();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("not both"));
    }

    #[test]
    fn test_validate_rejects_empty_selector() {
        let scenario = parse(
            r#"
name: empty selector
steps:
  - action: click
    selector: ""
"#,
        );
        let problems = scenario.validate();
        assert!(problems[0].contains("selector is empty"));
    }

    #[test]
    fn test_validate_rejects_empty_scenario() {
        let scenario = parse("name: nothing\nsteps: []");
        assert_eq!(scenario.validate(), vec!["scenario has no steps"]);
    }

    #[test]
    fn test_unknown_action_is_a_parse_error() {
        let result: std::result::Result<Scenario, _> = serde_yaml::from_str(
            r##"
name: bad
steps:
  - action: hover
    selector: "#x"
"##,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_describe_names_the_target() {
        let scenario = parse(
            r#"
name: describe
steps:
  - action: type
    selector: input[slot="input"]
    pierce: true
    index: 1
    text: test
    enter: true
  - action: pause
    ms: 500
"#,
        );
        assert_eq!(
            scenario.steps[0].describe(),
            "type 'test' + Enter into input[slot=\"input\"][1] (shadow-piercing)"
        );
        assert_eq!(scenario.steps[1].describe(), "pause 500 ms");
    }

    #[test]
    fn test_assertion_steps_are_soft_eligible() {
        let scenario = parse(
            r##"
name: softness
steps:
  - action: find
    selector: "#login-form"
  - action: assert_text
    contains: Dashboard
  - action: click
    selector: "#greet-button"
"##,
        );
        assert!(scenario.steps[0].is_assertion());
        assert!(scenario.steps[1].is_assertion());
        assert!(!scenario.steps[2].is_assertion());
    }
}
