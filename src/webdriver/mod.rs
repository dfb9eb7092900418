//! W3C WebDriver protocol implementation
//!
//! This module implements the client side of the WebDriver protocol
//! plus local driver process management.

pub mod client;
pub mod driver;
pub mod types;

pub use client::WebDriverClient;
pub use driver::DriverHandle;
pub use types::*;
