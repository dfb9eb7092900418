//! Scenario loading and execution
//!
//! Scenarios are YAML files describing ordered browser steps. The
//! runner executes them against isolated sessions and reports per-step
//! and per-scenario outcomes.

mod config;
mod runner;

pub use config::*;
pub use runner::{run_scenario, RunContext, ScenarioResult};
