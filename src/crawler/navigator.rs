//! Opening a channel feed in a browser session
//!
//! Public mode tries each public URL format until one shows messages, then
//! falls back to one last attempt at the scrollable feed. Authenticated mode
//! injects credentials, waits for a web client's chat list and opens the
//! channel inside it. Either way, failing to open the feed is fatal.

use crate::config::Config;
use crate::session::{selector_probe_script, BrowserSession, Credentials, Readiness};
use crate::target::{ChannelTarget, PublicFormat, APP_CLIENTS};
use crate::{Result, TelescrollError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Markers of a loaded public channel page
const PUBLIC_PAGE_READY: &str = ".tgme_page_title, .tgme_channel_info, .tgme_channel_history";

/// Markers of a public page that actually carries messages
const PUBLIC_MESSAGES: &str = ".tgme_widget_message, .message, .tgme_channel_history";

/// Markers of a web client that finished loading
const CHAT_LIST_READY: &str = ".dialogs-list, .chat-list, #column-left, .chatlist";

/// Markers of an opened conversation
const APP_MESSAGES_READY: &str = ".message, .messages-container, .bubbles, .bubble";

/// How the feed is accessed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrawlMode {
    /// The unauthenticated public pages
    #[default]
    Public,

    /// The logged-in web application
    Authenticated,
}

/// Opens channel feeds with the configured timeouts
#[derive(Debug, Clone)]
pub struct Navigator {
    page_timeout: Duration,
    selector_timeout: Duration,
}

impl Navigator {
    pub fn new(config: &Config) -> Self {
        Self {
            page_timeout: Duration::from_millis(config.browser.timeout_ms),
            selector_timeout: Duration::from_millis(config.scraping.wait_for_selector_ms),
        }
    }

    /// Opens the channel feed for `target`
    ///
    /// # Arguments
    ///
    /// * `session` - The browser session to drive
    /// * `target` - The resolved channel
    /// * `mode` - Public pages or the logged-in application
    /// * `credentials` - Required in authenticated mode
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The URL the feed was opened at
    /// * `Err(TelescrollError)` - The feed could not be opened
    pub async fn open<S>(
        &self,
        session: &mut S,
        target: &ChannelTarget,
        mode: CrawlMode,
        credentials: Option<&Credentials>,
    ) -> Result<String>
    where
        S: BrowserSession + ?Sized,
    {
        match mode {
            CrawlMode::Public => self.open_public(session, target).await,
            CrawlMode::Authenticated => {
                let credentials = credentials
                    .filter(|c| !c.is_empty())
                    .ok_or_else(|| {
                        TelescrollError::Authentication(
                            "no session credentials supplied".to_string(),
                        )
                    })?;
                self.open_authenticated(session, target, credentials).await
            }
        }
    }

    async fn open_public<S>(&self, session: &mut S, target: &ChannelTarget) -> Result<String>
    where
        S: BrowserSession + ?Sized,
    {
        let readiness = Readiness::Selector(PUBLIC_PAGE_READY.to_string());
        let limit = self.page_timeout + self.selector_timeout;

        for (format, url) in target.public_candidates() {
            tracing::info!("Trying {} format: {}", format, url);
            if let Err(e) = session.navigate(&url, readiness.clone(), limit).await {
                tracing::warn!("Failed to load {} format: {}", format, e);
                continue;
            }

            match has_messages(session).await {
                Ok(true) => {
                    tracing::info!("Loaded channel with {} format", format);
                    return Ok(url);
                }
                Ok(false) => tracing::warn!("{} format loaded but shows no messages", format),
                Err(e) => tracing::warn!("Could not inspect {} format: {}", format, e),
            }
        }

        let url = target.public_url(PublicFormat::Embedded);
        tracing::warn!("All URL formats failed, retrying {}", url);
        session
            .navigate(&url, Readiness::NetworkIdle, self.page_timeout)
            .await
            .map_err(|e| {
                tracing::error!("Navigation to {} failed: {}", url, e);
                TelescrollError::Navigation {
                    url: url.clone(),
                    message: e.to_string(),
                }
            })?;
        Ok(url)
    }

    async fn open_authenticated<S>(
        &self,
        session: &mut S,
        target: &ChannelTarget,
        credentials: &Credentials,
    ) -> Result<String>
    where
        S: BrowserSession + ?Sized,
    {
        tracing::info!("Using authenticated mode");
        if !credentials.cookies.is_empty() {
            session.set_cookies(&credentials.cookies).await?;
        }
        if !credentials.local_storage.is_empty() {
            let origin = ChannelTarget::app_client_url(APP_CLIENTS[0]);
            session
                .navigate(&origin, Readiness::Loaded, self.page_timeout)
                .await
                .map_err(|e| {
                    TelescrollError::Authentication(format!("could not reach {}: {}", origin, e))
                })?;
            session.set_local_storage(&credentials.local_storage).await?;
        }

        let chat_list = Readiness::Selector(CHAT_LIST_READY.to_string());
        let mut loaded = false;
        for client in APP_CLIENTS {
            let url = ChannelTarget::app_client_url(client);
            tracing::debug!("Trying web client {}", url);
            match session
                .navigate(&url, chat_list.clone(), self.page_timeout)
                .await
            {
                Ok(()) => {
                    tracing::info!("Loaded web client {}", url);
                    loaded = true;
                    break;
                }
                Err(e) => tracing::debug!("Web client {} failed: {}", url, e),
            }
        }
        if !loaded {
            tracing::error!("No web client showed a chat list");
            return Err(TelescrollError::Authentication(
                "no web client showed a chat list; the session is probably not logged in"
                    .to_string(),
            ));
        }

        let url = target.app_channel_url();
        session
            .navigate(
                &url,
                Readiness::Selector(APP_MESSAGES_READY.to_string()),
                self.page_timeout + self.selector_timeout,
            )
            .await
            .map_err(|e| {
                tracing::error!("Could not open {} in the web client: {}", target, e);
                TelescrollError::Authentication(format!("could not open {}: {}", target, e))
            })?;
        tracing::info!("Opened {} in authenticated mode", target);
        Ok(url)
    }
}

async fn has_messages<S>(session: &mut S) -> Result<bool>
where
    S: BrowserSession + ?Sized,
{
    let found = session
        .evaluate(&selector_probe_script(PUBLIC_MESSAGES))
        .await?;
    Ok(found.as_bool().unwrap_or(false))
}
