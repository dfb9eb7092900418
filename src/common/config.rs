//! Configuration file handling

use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// WebDriver configurations by name
    #[serde(default)]
    pub drivers: HashMap<String, DriverConfig>,

    /// Default settings
    #[serde(default)]
    pub defaults: Defaults,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,
}

/// Driver kind for capability and argument handling
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    /// chromedriver (Chrome/Chromium)
    #[default]
    Chromedriver,
    /// geckodriver (Firefox)
    Geckodriver,
    /// Any other W3C WebDriver endpoint
    Generic,
}

impl DriverKind {
    /// Infer the driver kind from a well-known binary name
    pub fn infer(name: &str) -> Self {
        match name {
            "chromedriver" => Self::Chromedriver,
            "geckodriver" => Self::Geckodriver,
            _ => Self::Generic,
        }
    }
}

/// Configuration for a WebDriver binary
#[derive(Debug, Deserialize, Clone)]
pub struct DriverConfig {
    /// Path to the driver executable
    pub path: PathBuf,

    /// Additional arguments to pass to the driver
    #[serde(default)]
    pub args: Vec<String>,

    /// Driver kind for specialized handling
    #[serde(default)]
    pub kind: DriverKind,
}

/// Default settings
#[derive(Debug, Deserialize)]
pub struct Defaults {
    /// Default driver to use
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Base URL scenarios resolve relative paths against
    #[serde(default)]
    pub base_url: Option<String>,

    /// Run the browser headless
    #[serde(default = "default_headless")]
    pub headless: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            base_url: None,
            headless: default_headless(),
        }
    }
}

fn default_driver() -> String {
    "chromedriver".to_string()
}

fn default_headless() -> bool {
    true
}

/// Timeout settings
#[derive(Debug, Clone, Deserialize)]
pub struct Timeouts {
    /// Timeout for page navigation in seconds
    #[serde(default = "default_navigate")]
    pub navigate_secs: u64,

    /// How long locate retries before giving up, in milliseconds
    #[serde(default = "default_find")]
    pub find_ms: u64,

    /// Interval between locate/wait polls, in milliseconds
    #[serde(default = "default_poll")]
    pub poll_ms: u64,

    /// How long to wait for a spawned driver to accept connections
    #[serde(default = "default_driver_startup")]
    pub driver_startup_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigate_secs: default_navigate(),
            find_ms: default_find(),
            poll_ms: default_poll(),
            driver_startup_secs: default_driver_startup(),
        }
    }
}

fn default_navigate() -> u64 {
    30
}
fn default_find() -> u64 {
    5000
}
fn default_poll() -> u64 {
    100
}
fn default_driver_startup() -> u64 {
    5
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
                path: path.display().to_string(),
                error: e.to_string(),
            })?;
        toml::from_str(&content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }

    /// Get driver configuration by name
    ///
    /// Falls back to searching PATH if not explicitly configured
    pub fn get_driver(&self, name: &str) -> Option<DriverConfig> {
        // Check explicit configuration first
        if let Some(config) = self.drivers.get(name) {
            return Some(config.clone());
        }

        // Try to find in PATH
        which::which(name).ok().map(|path| DriverConfig {
            path,
            args: Vec::new(),
            kind: DriverKind::infer(name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.defaults.driver, "chromedriver");
        assert!(config.defaults.headless);
        assert_eq!(config.timeouts.navigate_secs, 30);
        assert_eq!(config.timeouts.find_ms, 5000);
        assert_eq!(config.timeouts.poll_ms, 100);
        assert_eq!(config.timeouts.driver_startup_secs, 5);
    }

    #[test]
    fn test_parse_driver_table() {
        let toml = r#"
            [defaults]
            driver = "geckodriver"
            base_url = "http://localhost:8080"

            [drivers.geckodriver]
            path = "/usr/bin/geckodriver"
            args = ["--log", "warn"]
            kind = "geckodriver"

            [timeouts]
            find_ms = 2000
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.defaults.driver, "geckodriver");
        assert_eq!(
            config.defaults.base_url.as_deref(),
            Some("http://localhost:8080")
        );
        let driver = config.drivers.get("geckodriver").unwrap();
        assert_eq!(driver.path, PathBuf::from("/usr/bin/geckodriver"));
        assert_eq!(driver.args, vec!["--log", "warn"]);
        assert_eq!(driver.kind, DriverKind::Geckodriver);
        assert_eq!(config.timeouts.find_ms, 2000);
        // Unspecified timeouts keep their defaults
        assert_eq!(config.timeouts.poll_ms, 100);
    }

    #[test]
    fn test_get_driver_prefers_explicit_config() {
        let toml = r#"
            [drivers.chromedriver]
            path = "/opt/chromedriver"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        let driver = config.get_driver("chromedriver").unwrap();
        assert_eq!(driver.path, PathBuf::from("/opt/chromedriver"));
    }
}
