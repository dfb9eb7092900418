//! WebDriver process management
//!
//! Spawns a local driver binary (chromedriver, geckodriver, the bundled
//! mock) on a free port and waits for it to accept protocol requests.
//! Attaching to an already-running endpoint skips the spawn and only
//! runs the readiness probe.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::{Child, Command};
use tracing::{debug, warn};

use super::client::WebDriverClient;
use crate::common::config::DriverConfig;
use crate::common::{Error, Result};

/// Interval between readiness probes
const READY_POLL_MS: u64 = 50;

/// A running WebDriver endpoint
///
/// When the driver was spawned by us, dropping the handle kills the
/// child process. Attached endpoints are left running.
pub struct DriverHandle {
    endpoint: String,
    child: Option<Child>,
}

impl DriverHandle {
    /// Spawn a driver binary on a free local port and wait until ready
    pub async fn spawn(name: &str, config: &DriverConfig, startup_timeout: Duration) -> Result<Self> {
        let port = free_port()?;
        let endpoint = format!("http://127.0.0.1:{port}");

        let mut cmd = Command::new(&config.path);
        cmd.args(&config.args)
            .arg(format!("--port={port}"))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        debug!(driver = name, %endpoint, "spawning webdriver");
        let child = cmd.spawn().map_err(|e| {
            Error::DriverStartFailed(name.to_string(), format!("{}: {}", config.path.display(), e))
        })?;

        let mut handle = Self {
            endpoint,
            child: Some(child),
        };
        handle.wait_ready(startup_timeout).await?;
        Ok(handle)
    }

    /// Attach to an endpoint something else is managing
    pub async fn attach(url: &str, startup_timeout: Duration) -> Result<Self> {
        let mut handle = Self {
            endpoint: url.trim_end_matches('/').to_string(),
            child: None,
        };
        handle.wait_ready(startup_timeout).await?;
        Ok(handle)
    }

    /// The HTTP endpoint, e.g. `http://127.0.0.1:9515`
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether a spawned driver process is still alive
    pub fn is_running(&mut self) -> bool {
        match &mut self.child {
            Some(child) => child.try_wait().ok().flatten().is_none(),
            None => true,
        }
    }

    /// Poll `GET /status` until the endpoint answers or the timeout passes
    async fn wait_ready(&mut self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let probe = WebDriverClient::new(&self.endpoint, Duration::from_secs(2))?;

        loop {
            if let Some(child) = &mut self.child {
                if let Ok(Some(status)) = child.try_wait() {
                    return Err(Error::DriverStartFailed(
                        self.endpoint.clone(),
                        format!("driver exited during startup with {status}"),
                    ));
                }
            }

            match probe.status().await {
                Ok(status) => {
                    debug!(endpoint = %self.endpoint, ready = status.ready, "webdriver up");
                    return Ok(());
                }
                Err(_) if Instant::now() < deadline => {
                    tokio::time::sleep(Duration::from_millis(READY_POLL_MS)).await;
                }
                Err(_) => {
                    if let Some(child) = &mut self.child {
                        let _ = child.start_kill();
                    }
                    return Err(Error::DriverStartTimeout(timeout.as_secs()));
                }
            }
        }
    }
}

impl Drop for DriverHandle {
    fn drop(&mut self) {
        // Best-effort kill since we can't await in drop
        if let Some(child) = &mut self.child {
            if let Err(e) = child.start_kill() {
                warn!("failed to kill webdriver process: {e}");
            }
        }
    }
}

/// Ask the OS for a free TCP port
fn free_port() -> Result<u16> {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0))?;
    Ok(listener.local_addr()?.port())
}
