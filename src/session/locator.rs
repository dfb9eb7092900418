//! Element locators
//!
//! A locator is a CSS selector plus resolution options: whether to
//! pierce open shadow roots, and which match to take when several
//! elements qualify.

use std::fmt;

use serde::Deserialize;

/// Script that collects matches in the document and in every open
/// shadow root, in tree order. Returns an array of element handles.
pub const DEEP_QUERY_SCRIPT: &str = "\
const selector = arguments[0];
const matches = [];
const walk = (root) => {
    root.querySelectorAll(selector).forEach((el) => matches.push(el));
    root.querySelectorAll('*').forEach((el) => {
        if (el.shadowRoot) { walk(el.shadowRoot); }
    });
};
walk(document);
return matches;";

/// Script that dispatches a click directly on the element, bypassing
/// the driver's visibility and overlap checks.
pub const FORCE_CLICK_SCRIPT: &str = "arguments[0].click(); return null;";

/// Where and how to find an element
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Locator {
    /// CSS selector
    pub selector: String,

    /// Search inside open shadow roots as well as the document
    #[serde(default)]
    pub pierce: bool,

    /// Zero-based index into the match list; first match when absent
    #[serde(default)]
    pub index: Option<usize>,
}

impl Locator {
    /// Plain CSS locator for the first match
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            pierce: false,
            index: None,
        }
    }

    /// Enable shadow-root piercing
    pub fn pierced(mut self) -> Self {
        self.pierce = true;
        self
    }

    /// Take the Nth match instead of the first
    pub fn nth(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.selector)?;
        if let Some(index) = self.index {
            write!(f, "[{index}]")?;
        }
        if self.pierce {
            write!(f, " (shadow-piercing)")?;
        }
        Ok(())
    }
}
