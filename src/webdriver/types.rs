//! WebDriver protocol types
//!
//! These types represent W3C WebDriver request and response bodies.
//! See: https://www.w3.org/TR/webdriver2/

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The W3C element identifier key used in element references
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// The WebDriver key code for Enter
pub const ENTER_KEY: char = '\u{E007}';

// === Responses ===

/// Every WebDriver response wraps its payload in a `value` field
#[derive(Debug, Clone, Deserialize)]
pub struct WdResponse<T> {
    pub value: T,
}

/// Error body returned inside `value` for non-2xx responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WdError {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<String>,
}

impl WdError {
    pub fn is_no_such_element(&self) -> bool {
        self.error == "no such element" || self.error == "stale element reference"
    }

    pub fn is_not_interactable(&self) -> bool {
        matches!(
            self.error.as_str(),
            "element not interactable" | "element click intercepted" | "invalid element state"
        )
    }
}

/// Body of a successful `POST /session` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionValue {
    pub session_id: String,
    #[serde(default)]
    pub capabilities: Value,
}

/// Body of a `GET /status` response
#[derive(Debug, Clone, Deserialize)]
pub struct StatusValue {
    pub ready: bool,
    #[serde(default)]
    pub message: String,
}

/// Reference to a located element
///
/// Serializes to/from the W3C wire form
/// `{"element-6066-11e4-a52e-4f735466cecf": "<id>"}`, which is also the
/// shape script arguments and return values use for elements.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ElementRef {
    #[serde(rename = "element-6066-11e4-a52e-4f735466cecf")]
    pub id: String,
}

// === Requests ===

/// Body of `POST /session`
#[derive(Debug, Clone, Serialize)]
pub struct NewSessionRequest {
    pub capabilities: CapabilitiesRequest,
}

/// The `capabilities` object of a new-session request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitiesRequest {
    pub always_match: Value,
}

impl NewSessionRequest {
    /// Capabilities for Chrome/Chromium via chromedriver
    pub fn chrome(headless: bool) -> Self {
        let mut args = vec!["--disable-gpu".to_string(), "--no-sandbox".to_string()];
        if headless {
            args.push("--headless=new".to_string());
        }
        Self {
            capabilities: CapabilitiesRequest {
                always_match: serde_json::json!({
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args },
                }),
            },
        }
    }

    /// Capabilities for Firefox via geckodriver
    pub fn firefox(headless: bool) -> Self {
        let args: Vec<String> = if headless {
            vec!["-headless".to_string()]
        } else {
            Vec::new()
        };
        Self {
            capabilities: CapabilitiesRequest {
                always_match: serde_json::json!({
                    "browserName": "firefox",
                    "moz:firefoxOptions": { "args": args },
                }),
            },
        }
    }

    /// Capabilities with no browser-specific options
    pub fn generic() -> Self {
        Self {
            capabilities: CapabilitiesRequest {
                always_match: serde_json::json!({}),
            },
        }
    }
}

/// Body of `POST /session/{id}/url`
#[derive(Debug, Clone, Serialize)]
pub struct UrlRequest {
    pub url: String,
}

/// Body of `POST /session/{id}/element(s)`
#[derive(Debug, Clone, Serialize)]
pub struct FindRequest {
    pub using: String,
    pub value: String,
}

impl FindRequest {
    /// A CSS selector lookup (the only strategy the runner uses)
    pub fn css(selector: &str) -> Self {
        Self {
            using: "css selector".to_string(),
            value: selector.to_string(),
        }
    }
}

/// Body of `POST /session/{id}/element/{id}/value`
#[derive(Debug, Clone, Serialize)]
pub struct SendKeysRequest {
    pub text: String,
}

/// Body of `POST /session/{id}/execute/sync`
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteRequest {
    pub script: String,
    pub args: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_ref_wire_form() {
        let json = format!(r#"{{"{}": "abc-123"}}"#, ELEMENT_KEY);
        let elem: ElementRef = serde_json::from_str(&json).unwrap();
        assert_eq!(elem.id, "abc-123");

        let back = serde_json::to_value(&elem).unwrap();
        assert_eq!(back[ELEMENT_KEY], "abc-123");
    }

    #[test]
    fn test_chrome_capabilities_headless() {
        let req = NewSessionRequest::chrome(true);
        let json = serde_json::to_value(&req).unwrap();
        let args = &json["capabilities"]["alwaysMatch"]["goog:chromeOptions"]["args"];
        assert!(args
            .as_array()
            .unwrap()
            .iter()
            .any(|a| a == "--headless=new"));
    }

    #[test]
    fn test_error_code_classification() {
        let err = WdError {
            error: "element click intercepted".to_string(),
            message: "overlay in the way".to_string(),
            stacktrace: None,
        };
        assert!(err.is_not_interactable());
        assert!(!err.is_no_such_element());
    }

    #[test]
    fn test_response_envelope() {
        let body = r#"{"value": {"sessionId": "s1", "capabilities": {}}}"#;
        let resp: WdResponse<NewSessionValue> = serde_json::from_str(body).unwrap();
        assert_eq!(resp.value.session_id, "s1");
    }
}
