//! W3C WebDriver HTTP client
//!
//! One request per protocol operation, JSON over HTTP against a driver
//! endpoint (chromedriver, geckodriver, or the bundled mock driver).
//! Element errors are classified by W3C error code; "no such element"
//! surfaces as `Ok(None)` from the find methods so callers can poll.

use std::time::Duration;

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::trace;

use super::types::{
    ElementRef, ExecuteRequest, FindRequest, NewSessionRequest, NewSessionValue, SendKeysRequest,
    StatusValue, UrlRequest, WdError, WdResponse,
};
use crate::common::{Error, Result};

/// HTTP client for a single WebDriver endpoint
#[derive(Debug, Clone)]
pub struct WebDriverClient {
    client: Client,
    base_url: String,
}

impl WebDriverClient {
    /// Create a client for the given endpoint, e.g. `http://127.0.0.1:9515`
    ///
    /// The timeout bounds every protocol request, so it must cover the
    /// slowest operation the session performs (navigation).
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The endpoint this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // === Session lifecycle ===

    /// `GET /status`, the readiness probe
    pub async fn status(&self) -> Result<StatusValue> {
        self.send(Method::GET, "/status", None).await
    }

    /// `POST /session`, returning the new session id
    pub async fn new_session(&self, request: &NewSessionRequest) -> Result<String> {
        let body = serde_json::to_value(request)?;
        let value: NewSessionValue = self.send(Method::POST, "/session", Some(body)).await?;
        Ok(value.session_id)
    }

    /// `DELETE /session/{id}`
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        let _: Value = self
            .send(Method::DELETE, &format!("/session/{session_id}"), None)
            .await?;
        Ok(())
    }

    // === Navigation ===

    /// `POST /session/{id}/url`
    pub async fn goto(&self, session_id: &str, url: &str) -> Result<()> {
        let body = serde_json::to_value(UrlRequest {
            url: url.to_string(),
        })?;
        let _: Value = self
            .send(Method::POST, &format!("/session/{session_id}/url"), Some(body))
            .await?;
        Ok(())
    }

    /// `GET /session/{id}/url`
    pub async fn current_url(&self, session_id: &str) -> Result<String> {
        self.send(Method::GET, &format!("/session/{session_id}/url"), None)
            .await
    }

    // === Element lookup ===

    /// `POST /session/{id}/elements`, an empty vec when nothing matches
    pub async fn find_all(&self, session_id: &str, selector: &str) -> Result<Vec<ElementRef>> {
        let body = serde_json::to_value(FindRequest::css(selector))?;
        match self
            .send_checked(
                Method::POST,
                &format!("/session/{session_id}/elements"),
                Some(body),
            )
            .await?
        {
            Ok(elems) => Ok(elems),
            Err(wire) if wire.is_no_such_element() => Ok(Vec::new()),
            Err(wire) => Err(Self::map_wire_error(wire)),
        }
    }

    // === Element interaction ===

    /// `POST /session/{id}/element/{eid}/click`
    pub async fn click(&self, session_id: &str, elem: &ElementRef) -> Result<()> {
        let _: Value = self
            .send(
                Method::POST,
                &format!("/session/{}/element/{}/click", session_id, elem.id),
                Some(serde_json::json!({})),
            )
            .await?;
        Ok(())
    }

    /// `POST /session/{id}/element/{eid}/value`
    pub async fn send_keys(&self, session_id: &str, elem: &ElementRef, text: &str) -> Result<()> {
        let body = serde_json::to_value(SendKeysRequest {
            text: text.to_string(),
        })?;
        let _: Value = self
            .send(
                Method::POST,
                &format!("/session/{}/element/{}/value", session_id, elem.id),
                Some(body),
            )
            .await?;
        Ok(())
    }

    /// `GET /session/{id}/element/{eid}/text`, the rendered text of the element
    pub async fn text(&self, session_id: &str, elem: &ElementRef) -> Result<String> {
        self.send(
            Method::GET,
            &format!("/session/{}/element/{}/text", session_id, elem.id),
            None,
        )
        .await
    }

    /// `GET /session/{id}/element/{eid}/displayed`
    pub async fn is_displayed(&self, session_id: &str, elem: &ElementRef) -> Result<bool> {
        self.send(
            Method::GET,
            &format!("/session/{}/element/{}/displayed", session_id, elem.id),
            None,
        )
        .await
    }

    // === Script execution ===

    /// `POST /session/{id}/execute/sync`
    pub async fn execute(&self, session_id: &str, script: &str, args: Vec<Value>) -> Result<Value> {
        let body = serde_json::to_value(ExecuteRequest {
            script: script.to_string(),
            args,
        })?;
        self.send(
            Method::POST,
            &format!("/session/{session_id}/execute/sync"),
            Some(body),
        )
        .await
    }

    // === Transport ===

    /// Send a request, mapping protocol errors onto the runner taxonomy
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T> {
        match self.send_checked(method, path, body).await? {
            Ok(value) => Ok(value),
            Err(wire) => Err(Self::map_wire_error(wire)),
        }
    }

    /// Send a request, returning the protocol-level outcome unmapped
    ///
    /// The find methods need the raw error body to treat "no such element"
    /// as an ordinary result rather than a failure.
    async fn send_checked<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<std::result::Result<T, WdError>> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method.clone(), &url);
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        trace!(%method, %url, %status, "webdriver response");

        if status.is_success() {
            let parsed: WdResponse<T> = serde_json::from_str(&text).map_err(|e| {
                Error::Protocol(format!("malformed response from {url}: {e}"))
            })?;
            Ok(Ok(parsed.value))
        } else {
            let parsed: WdResponse<WdError> = serde_json::from_str(&text).map_err(|_| {
                Error::Protocol(format!("HTTP {status} from {url}: {text}"))
            })?;
            Ok(Err(parsed.value))
        }
    }

    /// Map a wire error onto the runner taxonomy
    ///
    /// Interactability failures keep their W3C message; the session layer
    /// replaces the placeholder selector with the locator it was resolving.
    fn map_wire_error(wire: WdError) -> Error {
        if wire.is_not_interactable() {
            Error::NotInteractable {
                selector: "<element>".to_string(),
                reason: format!("{}: {}", wire.error, wire.message),
            }
        } else if wire.error == "invalid session id" {
            Error::SessionTerminated(wire.message)
        } else {
            Error::Protocol(format!("{}: {}", wire.error, wire.message))
        }
    }
}
