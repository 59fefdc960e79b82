//! Chromium-backed browser session over the DevTools protocol

use super::{
    local_storage_script, scroll_script, selector_probe_script, BrowserSession, Readiness,
    ScrollTarget, SessionCookie, SessionError, SessionResult,
};
use crate::config::BrowserConfig;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, EnableParams, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
    RequestId,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::listeners::EventStream;
use chromiumoxide::Page;
use futures::StreamExt;
use std::collections::HashSet;
use std::hash::Hash;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};

const SELECTOR_POLL: Duration = Duration::from_millis(200);

/// How long the network must stay quiet to count as idle
const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

/// Requests allowed in flight while the network counts as idle
const NETWORK_IDLE_MAX_IN_FLIGHT: usize = 2;

impl From<CdpError> for SessionError {
    fn from(e: CdpError) -> Self {
        SessionError::Browser(e.to_string())
    }
}

/// One Chromium page driven through chromiumoxide
pub struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Page,
}

impl ChromiumSession {
    /// Launches a browser configured from `config` and opens a blank page
    ///
    /// # Arguments
    ///
    /// * `config` - Browser section of the crawler configuration
    ///
    /// # Returns
    ///
    /// * `Ok(ChromiumSession)` - A session ready for navigation
    /// * `Err(SessionError)` - The browser could not be launched
    pub async fn launch(config: &BrowserConfig) -> SessionResult<Self> {
        let mut builder = ChromeConfig::builder()
            .window_size(config.viewport_width, config.viewport_height)
            .request_timeout(Duration::from_millis(config.timeout_ms))
            .arg(format!("--user-agent={}", config.user_agent))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage");
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.executable_path {
            builder = builder.chrome_executable(path);
        }
        let chrome_config = builder.build().map_err(SessionError::Browser)?;

        let (browser, mut handler) = Browser::launch(chrome_config).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler stopped: {}", e);
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        page.execute(EnableParams::default()).await?;
        tracing::debug!(
            "Launched browser ({}x{}, headless: {})",
            config.viewport_width, config.viewport_height, config.headless
        );

        Ok(Self {
            browser,
            handler,
            page,
        })
    }

    /// Closes the browser and waits for its event loop to finish
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!("Failed to close browser cleanly: {}", e);
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
    }

    async fn wait_for_selector(&self, css: &str, deadline: Instant) -> SessionResult<()> {
        let probe = selector_probe_script(css);
        loop {
            let found = self
                .page
                .evaluate(probe.as_str())
                .await?
                .into_value::<bool>()
                .unwrap_or(false);
            if found {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(SessionError::Navigation(format!(
                    "selector {} never appeared",
                    css
                )));
            }
            sleep(SELECTOR_POLL).await;
        }
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(
        &mut self,
        url: &str,
        readiness: Readiness,
        limit: Duration,
    ) -> SessionResult<()> {
        let deadline = Instant::now() + limit;
        let load = async {
            // Subscribe before navigating so no request of the load is missed
            let network = match readiness {
                Readiness::NetworkIdle => Some(NetworkActivity::subscribe(&self.page).await?),
                _ => None,
            };
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            match &readiness {
                Readiness::Loaded => Ok(()),
                Readiness::NetworkIdle => match network {
                    Some(activity) => activity.wait_for_idle().await,
                    None => Ok(()),
                },
                Readiness::Selector(css) => self.wait_for_selector(css, deadline).await,
            }
        };

        match timeout(limit, load).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::Timeout(limit, url.to_string())),
        }
    }

    async fn content(&mut self) -> SessionResult<String> {
        Ok(self.page.content().await?)
    }

    async fn evaluate(&mut self, script: &str) -> SessionResult<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| SessionError::Script(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn set_cookies(&mut self, cookies: &[SessionCookie]) -> SessionResult<()> {
        let params = cookies
            .iter()
            .map(|cookie| {
                CookieParam::builder()
                    .name(cookie.name.clone())
                    .value(cookie.value.clone())
                    .domain(cookie.domain.clone())
                    .path(cookie.path.clone())
                    .secure(cookie.secure)
                    .http_only(cookie.http_only)
                    .build()
                    .map_err(SessionError::Browser)
            })
            .collect::<SessionResult<Vec<_>>>()?;
        self.page.set_cookies(params).await?;
        Ok(())
    }

    async fn set_local_storage(&mut self, entries: &[(String, String)]) -> SessionResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        self.evaluate(&local_storage_script(entries)).await?;
        Ok(())
    }

    async fn scroll_to(&mut self, target: ScrollTarget) -> SessionResult<()> {
        self.evaluate(&scroll_script(&target)).await?;
        Ok(())
    }
}

/// Request lifecycle events of one page, used to detect network idle
struct NetworkActivity {
    sent: EventStream<EventRequestWillBeSent>,
    finished: EventStream<EventLoadingFinished>,
    failed: EventStream<EventLoadingFailed>,
}

impl NetworkActivity {
    async fn subscribe(page: &Page) -> SessionResult<Self> {
        Ok(Self {
            sent: page.event_listener::<EventRequestWillBeSent>().await?,
            finished: page.event_listener::<EventLoadingFinished>().await?,
            failed: page.event_listener::<EventLoadingFailed>().await?,
        })
    }

    /// Resolves once few enough requests stayed in flight for the idle window
    ///
    /// The caller bounds the wait with its own timeout.
    async fn wait_for_idle(mut self) -> SessionResult<()> {
        let mut in_flight = InFlight::<RequestId>::default();
        let window = sleep(NETWORK_IDLE_WINDOW);
        tokio::pin!(window);

        loop {
            let became_idle = tokio::select! {
                () = &mut window, if in_flight.is_idle() => return Ok(()),
                Some(event) = self.sent.next() => {
                    in_flight.start(event.request_id.clone());
                    false
                }
                Some(event) = self.finished.next() => in_flight.finish(&event.request_id),
                Some(event) = self.failed.next() => in_flight.finish(&event.request_id),
                else => return Err(SessionError::Closed),
            };
            if became_idle {
                window.as_mut().reset(Instant::now() + NETWORK_IDLE_WINDOW);
            }
        }
    }
}

/// Requests started but not yet finished or failed
#[derive(Debug)]
struct InFlight<T> {
    requests: HashSet<T>,
}

impl<T> Default for InFlight<T> {
    fn default() -> Self {
        Self {
            requests: HashSet::new(),
        }
    }
}

impl<T: Hash + Eq> InFlight<T> {
    fn is_idle(&self) -> bool {
        self.requests.len() <= NETWORK_IDLE_MAX_IN_FLIGHT
    }

    fn start(&mut self, request: T) {
        self.requests.insert(request);
    }

    /// Returns true if this request started an idle period
    fn finish(&mut self, request: &T) -> bool {
        let was_idle = self.is_idle();
        self.requests.remove(request);
        !was_idle && self.is_idle()
    }
}
