//! Browser session capability
//!
//! The crawler never talks to a browser directly. It drives anything that
//! implements [`BrowserSession`]: the Chromium adapter behind the `chromium`
//! feature in production, scripted in-memory sessions in tests.

#[cfg(feature = "chromium")]
mod chromium;

#[cfg(feature = "chromium")]
pub use chromium::ChromiumSession;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a browser session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Timed out after {0:?} waiting for {1}")]
    Timeout(Duration, String),

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Session closed")]
    Closed,
}

/// Result type alias for session operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// What `navigate` waits for before returning
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// The document finished loading
    Loaded,

    /// After load, at most two requests stayed in flight for half a second
    NetworkIdle,

    /// An element matching this CSS selector exists
    Selector(String),
}

/// Where `scroll_to` moves the viewport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrollTarget {
    /// The top of the window
    WindowTop,

    /// The top of the first element matching this CSS selector, or the
    /// window when nothing matches
    ElementTop(String),
}

/// A cookie injected before authenticated navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,

    #[serde(default = "default_cookie_path")]
    pub path: String,

    #[serde(default)]
    pub secure: bool,

    #[serde(default)]
    pub http_only: bool,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

/// Credentials for the logged-in web application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default)]
    pub cookies: Vec<SessionCookie>,

    /// `localStorage` entries as `(key, value)` pairs
    #[serde(default)]
    pub local_storage: Vec<(String, String)>,
}

impl Credentials {
    /// Returns true if there is nothing to inject
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.local_storage.is_empty()
    }
}

/// A remotely-controlled browser page
///
/// Implementations own one page. The crawler holds `&mut` for the whole
/// crawl, so a session never serves two crawls at once.
#[async_trait]
pub trait BrowserSession: Send {
    /// Loads `url` and waits for `readiness`, failing after `timeout`
    async fn navigate(
        &mut self,
        url: &str,
        readiness: Readiness,
        timeout: Duration,
    ) -> SessionResult<()>;

    /// Returns the page's current serialized markup
    async fn content(&mut self) -> SessionResult<String>;

    /// Evaluates a script in the page and returns its JSON result
    async fn evaluate(&mut self, script: &str) -> SessionResult<serde_json::Value>;

    /// Installs cookies for subsequent navigations
    async fn set_cookies(&mut self, cookies: &[SessionCookie]) -> SessionResult<()>;

    /// Writes `localStorage` entries on the current origin
    async fn set_local_storage(&mut self, entries: &[(String, String)]) -> SessionResult<()>;

    /// Scrolls the page or a container
    async fn scroll_to(&mut self, target: ScrollTarget) -> SessionResult<()>;
}

/// Builds the script that writes `entries` into `localStorage`
pub fn local_storage_script(entries: &[(String, String)]) -> String {
    let mut script = String::from("(() => {");
    for (key, value) in entries {
        let key = serde_json::Value::String(key.clone());
        let value = serde_json::Value::String(value.clone());
        script.push_str(&format!(" localStorage.setItem({}, {});", key, value));
    }
    script.push_str(" return true; })()");
    script
}

/// Builds the script that scrolls to `target`
pub fn scroll_script(target: &ScrollTarget) -> String {
    match target {
        ScrollTarget::WindowTop => "window.scrollTo(0, 0); true".to_string(),
        ScrollTarget::ElementTop(css) => {
            let css = serde_json::Value::String(css.clone());
            format!(
                "(() => {{ const el = document.querySelector({}); \
                 if (el) {{ el.scrollTop = 0; }} else {{ window.scrollTo(0, 0); }} return true; }})()",
                css
            )
        }
    }
}

/// Builds the script that reports whether `css` matches anything
pub fn selector_probe_script(css: &str) -> String {
    let css = serde_json::Value::String(css.to_string());
    format!("document.querySelector({}) !== null", css)
}
