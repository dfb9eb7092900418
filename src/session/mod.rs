//! Browser session lifecycle and step primitives
//!
//! One `Session` per scenario, exclusively owned by it. Every locate
//! goes back to the page; element handles are never cached across
//! polls, so a step always sees the page as it currently is.

pub mod locator;

use std::time::{Duration, Instant};

use tracing::debug;
use url::Url;

use crate::common::config::Timeouts;
use crate::common::{Error, Result};
use crate::webdriver::{ElementRef, NewSessionRequest, WebDriverClient, ENTER_KEY};

pub use locator::Locator;
use locator::{DEEP_QUERY_SCRIPT, FORCE_CLICK_SCRIPT};

/// A condition the page must reach before the scenario continues
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    /// An element matching the locator exists and is displayed
    SelectorVisible(Locator),
    /// No element matches the locator
    SelectorGone(Locator),
    /// The page's visible text contains the string
    TextVisible(String),
    /// The page's visible text no longer contains the string
    TextGone(String),
}

impl std::fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelectorVisible(locator) => write!(f, "'{locator}' visible"),
            Self::SelectorGone(locator) => write!(f, "'{locator}' gone"),
            Self::TextVisible(text) => write!(f, "text '{text}' visible"),
            Self::TextGone(text) => write!(f, "text '{text}' gone"),
        }
    }
}

/// An isolated browser session against one WebDriver endpoint
///
/// Cookies and storage live and die with the session, so scenarios
/// that each open their own never observe one another's state.
pub struct Session {
    /// Protocol client for the driver endpoint
    client: WebDriverClient,
    /// WebDriver session id
    id: String,
    /// Base URL relative navigation targets resolve against
    base_url: Option<Url>,
    /// Find/poll timing
    timeouts: Timeouts,
}

impl Session {
    /// Open a fresh session on the driver
    pub async fn open(
        client: WebDriverClient,
        capabilities: &NewSessionRequest,
        base_url: Option<Url>,
        timeouts: Timeouts,
    ) -> Result<Self> {
        let id = client.new_session(capabilities).await?;
        debug!(session = %id, "session opened");
        Ok(Self {
            client,
            id,
            base_url,
            timeouts,
        })
    }

    /// The WebDriver session id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Delete the session on the driver
    ///
    /// Always called by the runner, pass or fail, so browser state from
    /// one scenario can never leak into the next.
    pub async fn close(self) -> Result<()> {
        debug!(session = %self.id, "closing session");
        self.client.delete_session(&self.id).await
    }

    // === Navigation ===

    /// Load a URL, resolving relative paths against the base URL
    pub async fn navigate(&self, path: &str) -> Result<()> {
        let url = resolve_url(self.base_url.as_ref(), path)?;
        debug!(%url, "navigating");
        self.client
            .goto(&self.id, url.as_str())
            .await
            .map_err(|e| Error::navigation(url.as_str(), &e.to_string()))
    }

    /// The URL the browser is currently showing
    pub async fn current_url(&self) -> Result<String> {
        self.client.current_url(&self.id).await
    }

    // === Element resolution ===

    /// Resolve a locator, polling until the find timeout
    ///
    /// Elements that appear after a render delay are found on a later
    /// poll; a locator that never matches fails with the full wait in
    /// the error message.
    pub async fn locate(&self, locator: &Locator) -> Result<ElementRef> {
        let deadline = Instant::now() + Duration::from_millis(self.timeouts.find_ms);
        loop {
            if let Some(elem) = self.try_locate(locator).await? {
                return Ok(elem);
            }
            if Instant::now() >= deadline {
                return Err(Error::element_not_found(
                    &locator.to_string(),
                    self.timeouts.find_ms,
                ));
            }
            tokio::time::sleep(Duration::from_millis(self.timeouts.poll_ms)).await;
        }
    }

    /// One resolution attempt, no retry
    async fn try_locate(&self, locator: &Locator) -> Result<Option<ElementRef>> {
        let matches = if locator.pierce {
            let value = self
                .client
                .execute(
                    &self.id,
                    DEEP_QUERY_SCRIPT,
                    vec![serde_json::Value::String(locator.selector.clone())],
                )
                .await?;
            serde_json::from_value::<Vec<ElementRef>>(value)
                .map_err(|e| Error::Protocol(format!("deep query returned non-elements: {e}")))?
        } else {
            self.client.find_all(&self.id, &locator.selector).await?
        };
        Ok(matches.into_iter().nth(locator.index.unwrap_or(0)))
    }

    // === Interaction ===

    /// Send keystrokes to a located element
    ///
    /// `press_enter` appends the WebDriver Enter key after the text,
    /// which submits the enclosing form the way a user would.
    pub async fn type_text(&self, locator: &Locator, text: &str, press_enter: bool) -> Result<()> {
        let elem = self.locate(locator).await?;
        let mut keys = text.to_string();
        if press_enter {
            keys.push(ENTER_KEY);
        }
        self.client
            .send_keys(&self.id, &elem, &keys)
            .await
            .map_err(|e| name_selector(e, locator))
    }

    /// Click a located element
    ///
    /// `force` dispatches the click from script, skipping the driver's
    /// visibility and overlap checks.
    pub async fn click(&self, locator: &Locator, force: bool) -> Result<()> {
        let elem = self.locate(locator).await?;
        if force {
            self.client
                .execute(&self.id, FORCE_CLICK_SCRIPT, vec![serde_json::to_value(&elem)?])
                .await?;
            Ok(())
        } else {
            self.client
                .click(&self.id, &elem)
                .await
                .map_err(|e| name_selector(e, locator))
        }
    }

    // === Observation ===

    /// The page's rendered text (the body element's text)
    pub async fn visible_text(&self) -> Result<String> {
        let body = self
            .client
            .find_all(&self.id, "body")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Protocol("page has no body element".to_string()))?;
        self.client.text(&self.id, &body).await
    }

    // === Assertions ===

    /// Assert the page's visible text contains `needle`
    ///
    /// Retries until the find timeout so an assertion right after an
    /// action tolerates the page still rendering.
    pub async fn assert_text_contains(&self, needle: &str) -> Result<()> {
        let deadline = Instant::now() + Duration::from_millis(self.timeouts.find_ms);
        loop {
            let text = self.visible_text().await?;
            if text.contains(needle) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Error::Assertion(format!(
                    "page text does not contain '{}' after {} ms (page shows: '{}')",
                    needle,
                    self.timeouts.find_ms,
                    snippet(&text)
                )));
            }
            tokio::time::sleep(Duration::from_millis(self.timeouts.poll_ms)).await;
        }
    }

    /// Assert the current URL contains `needle`
    pub async fn assert_url_contains(&self, needle: &str) -> Result<()> {
        let deadline = Instant::now() + Duration::from_millis(self.timeouts.find_ms);
        loop {
            let url = self.current_url().await?;
            if url.contains(needle) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Error::Assertion(format!(
                    "URL '{}' does not contain '{}' after {} ms",
                    url, needle, self.timeouts.find_ms
                )));
            }
            tokio::time::sleep(Duration::from_millis(self.timeouts.poll_ms)).await;
        }
    }

    // === Waiting ===

    /// Poll until the condition holds or the timeout passes
    pub async fn wait_until(&self, condition: &WaitCondition, timeout_ms: u64) -> Result<()> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if self.check(condition).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Error::WaitTimeout {
                    condition: condition.to_string(),
                    waited_ms: timeout_ms,
                });
            }
            tokio::time::sleep(Duration::from_millis(self.timeouts.poll_ms)).await;
        }
    }

    /// One evaluation of a wait condition
    async fn check(&self, condition: &WaitCondition) -> Result<bool> {
        match condition {
            WaitCondition::SelectorVisible(locator) => match self.try_locate(locator).await? {
                Some(elem) => self.client.is_displayed(&self.id, &elem).await,
                None => Ok(false),
            },
            WaitCondition::SelectorGone(locator) => {
                Ok(self.try_locate(locator).await?.is_none())
            }
            WaitCondition::TextVisible(text) => Ok(self.visible_text().await?.contains(text)),
            WaitCondition::TextGone(text) => Ok(!self.visible_text().await?.contains(text)),
        }
    }
}

/// Resolve a navigation target against an optional base URL
///
/// Absolute http(s) URLs pass through untouched.
fn resolve_url(base: Option<&Url>, path: &str) -> Result<Url> {
    if let Ok(url) = Url::parse(path) {
        if url.scheme() == "http" || url.scheme() == "https" {
            return Ok(url);
        }
    }
    match base {
        Some(base) => base
            .join(path)
            .map_err(|e| Error::navigation(path, &format!("cannot resolve against {base}: {e}"))),
        None => Err(Error::Config(format!(
            "relative path '{path}' requires a base URL (--base-url or defaults.base_url)"
        ))),
    }
}

/// Put the failing locator into an interactability error
fn name_selector(e: Error, locator: &Locator) -> Error {
    match e {
        Error::NotInteractable { reason, .. } => Error::NotInteractable {
            selector: locator.to_string(),
            reason,
        },
        other => other,
    }
}

/// First line of page text, shortened for error messages
fn snippet(text: &str) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() > 120 {
        let cut: String = line.chars().take(120).collect();
        format!("{cut}...")
    } else if text.lines().count() > 1 {
        format!("{line}...")
    } else {
        line.to_string()
    }
}
