//! Error types for the UI test runner
//!
//! Messages are written to be actionable from a CI log: the selector or
//! matcher that failed is always part of the message, along with how long
//! the runner waited for it.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the UI test runner
#[derive(Error, Debug)]
pub enum Error {
    // === Driver Errors ===
    #[error("WebDriver binary '{name}' not found. Searched: {searched}")]
    DriverNotFound { name: String, searched: String },

    #[error("WebDriver '{0}' failed to start: {1}")]
    DriverStartFailed(String, String),

    #[error("WebDriver did not become ready within {0} seconds")]
    DriverStartTimeout(u64),

    #[error("WebDriver request failed: {0}")]
    DriverRequest(String),

    #[error("WebDriver protocol error: {0}")]
    Protocol(String),

    // === Session Errors ===
    #[error("No browser session active")]
    SessionNotActive,

    #[error("Browser session ended unexpectedly: {0}")]
    SessionTerminated(String),

    // === Step Errors (the scenario-facing taxonomy) ===
    #[error("Navigation to '{url}' failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("No element matched '{selector}' within {waited_ms} ms")]
    ElementNotFound { selector: String, waited_ms: u64 },

    #[error("Element '{selector}' is not interactable: {reason}")]
    NotInteractable { selector: String, reason: String },

    #[error("Assertion failed: {0}")]
    Assertion(String),

    #[error("Condition '{condition}' not met within {waited_ms} ms")]
    WaitTimeout { condition: String, waited_ms: u64 },

    // === Suite Errors ===
    #[error("{failed} of {total} scenarios failed")]
    Suite { failed: usize, total: usize },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Invalid scenario file '{path}': {reason}")]
    ScenarioParse { path: String, reason: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a driver not found error with search paths
    pub fn driver_not_found<S: AsRef<str>>(name: &str, paths: &[S]) -> Self {
        Self::DriverNotFound {
            name: name.to_string(),
            searched: paths
                .iter()
                .map(|s| s.as_ref())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Create a navigation error
    pub fn navigation(url: &str, reason: &str) -> Self {
        Self::Navigation {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an element not found error
    pub fn element_not_found(selector: &str, waited_ms: u64) -> Self {
        Self::ElementNotFound {
            selector: selector.to_string(),
            waited_ms,
        }
    }

    /// Create a not interactable error
    pub fn not_interactable(selector: &str, reason: &str) -> Self {
        Self::NotInteractable {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a scenario parse error
    pub fn scenario_parse(path: &std::path::Path, reason: impl std::fmt::Display) -> Self {
        Self::ScenarioParse {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error came from an assertion rather than machinery
    pub fn is_assertion(&self) -> bool {
        matches!(self, Self::Assertion(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::DriverRequest(e.to_string())
    }
}
