//! uitest - A scenario-driven browser UI test runner
//!
//! This library drives web applications through the W3C WebDriver
//! protocol and asserts on what the page shows, from YAML scenario
//! files of navigate/find/type/click/assert steps.

pub mod cli;
pub mod commands;
pub mod common;
pub mod scenario;
pub mod session;
pub mod webdriver;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use scenario::{Scenario, Step};
pub use session::{Locator, Session};
