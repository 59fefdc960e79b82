//! Scroll loop coordination
//!
//! One crawl is a single cooperative loop over an already-opened feed:
//!
//! 1. Extract: read the page, extract records, merge new ones into the store
//! 2. Evaluate: count cap, then the termination policy, then the memory guard
//! 3. Advance: scroll towards older posts and wait for the page to settle
//!
//! The store, progress counters and guard live for exactly one crawl.

use crate::config::Config;
use crate::crawler::guard::ResourceGuard;
use crate::crawler::store::DeduplicationStore;
use crate::crawler::termination::{CrawlProgress, StopReason, TerminationPolicy};
use crate::extract::{extract_page, Rendering};
use crate::records::{Channel, Post};
use crate::session::BrowserSession;
use crate::Result;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Caps at or above this are treated as "no cap"
pub const UNBOUNDED_CAP: usize = 10_000;

/// Inclusive date window for accepted records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateBounds {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateBounds {
    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

/// Returns the effective cap: only `0 < cap < 10 000` limits the crawl
pub fn effective_cap(requested: Option<usize>) -> Option<usize> {
    requested.filter(|cap| *cap > 0 && *cap < UNBOUNDED_CAP)
}

/// What a finished scroll loop produced
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Channel metadata from the first pass that named a channel
    pub channel: Channel,

    /// Records newest first, truncated to the cap
    pub posts: Vec<Post>,

    pub stop_reason: StopReason,
    pub iterations: u32,
    pub restricted: usize,
}

/// Drives the extract/evaluate/advance loop over one session
pub struct ScrollCrawler<'s, S: BrowserSession + ?Sized> {
    session: &'s mut S,
    policy: TerminationPolicy,
    guard: ResourceGuard,
    settle: Duration,
    bounds: DateBounds,
    cap: Option<usize>,
    fallback_handle: Option<String>,
}

impl<'s, S: BrowserSession + ?Sized> ScrollCrawler<'s, S> {
    /// Creates a crawler with the configured policy and a real memory guard
    pub fn new(session: &'s mut S, config: &Config) -> Self {
        Self {
            session,
            policy: TerminationPolicy::from_config(&config.scraping),
            guard: ResourceGuard::system(&config.guard),
            settle: Duration::from_millis(config.scraping.scroll_delay_ms),
            bounds: DateBounds::default(),
            cap: None,
            fallback_handle: None,
        }
    }

    pub fn with_guard(mut self, guard: ResourceGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_policy(mut self, policy: TerminationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_date_bounds(mut self, bounds: DateBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Sets the requested record cap; caps outside `1..10 000` are ignored
    pub fn with_count_cap(mut self, requested: Option<usize>) -> Self {
        self.cap = effective_cap(requested);
        self
    }

    /// Handle used for channel metadata when the page names none
    pub fn with_fallback_handle(mut self, handle: impl Into<String>) -> Self {
        self.fallback_handle = Some(handle.into());
        self
    }

    /// Runs the loop until a stop condition fires
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutcome)` - The collected records and why the loop stopped
    /// * `Err(TelescrollError)` - The very first page read failed; later
    ///   read failures end the loop with `StopReason::SessionLost`
    pub async fn run(self) -> Result<CrawlOutcome> {
        let Self {
            session,
            policy,
            mut guard,
            settle,
            bounds,
            cap,
            fallback_handle,
        } = self;

        let mut store = DeduplicationStore::new();
        let mut progress = CrawlProgress::new();
        let mut channel: Option<Channel> = None;

        tracing::info!(
            "Starting scroll loop (max {} iterations, cap {})",
            policy.max_iterations,
            cap.map_or_else(|| "none".to_string(), |c| c.to_string())
        );

        let stop_reason = loop {
            // Extract
            let html = match session.content().await {
                Ok(html) => html,
                Err(e) if progress.iterations() == 0 => return Err(e.into()),
                Err(e) => {
                    tracing::warn!(
                        "Lost the page after {} iterations, keeping {} posts: {}",
                        progress.iterations(),
                        store.len(),
                        e
                    );
                    break StopReason::SessionLost;
                }
            };

            let page = extract_page(&html, fallback_handle.as_deref());
            let rendering = page.rendering;
            if channel.as_ref().map_or(true, Channel::has_unknown_handle) {
                channel = Some(page.channel);
            }

            let mut net_new = 0;
            for post in page.posts {
                if !bounds.contains(post.date) {
                    tracing::trace!("Post {} at {} is outside the date range", post.id, post.date);
                    continue;
                }
                if store.contains(&post.id) {
                    continue;
                }
                if post.is_restricted() {
                    tracing::warn!("Found restricted post {}: {}", post.id, post.content);
                }
                if store.insert(post) {
                    net_new += 1;
                }
            }

            let position = measure_position(&mut *session, rendering).await;
            progress.record(net_new, position);
            tracing::debug!(
                "Iteration {}: {} new, {} total ({})",
                progress.iterations(),
                net_new,
                store.len(),
                rendering
            );

            // Evaluate
            if let Some(cap) = cap {
                if store.len() >= cap {
                    tracing::info!("Reached post limit: {}", cap);
                    break StopReason::CountCapReached;
                }
            }
            if let Some(reason) = policy.evaluate(&progress) {
                tracing::info!("Stopping: {}", reason);
                break reason;
            }
            if let Some(used_mb) = guard.check(progress.iterations()) {
                tracing::warn!("Memory usage high ({} MB), stopping scroll", used_mb);
                break StopReason::MemoryLimit;
            }

            // Advance
            if let Err(e) = session.scroll_to(rendering.scroll_target()).await {
                tracing::warn!("Scroll failed: {}", e);
            }
            if !settle.is_zero() {
                tokio::time::sleep(settle).await;
            }
        };

        let restricted = store.restricted_count();
        tracing::info!(
            "Scrolling complete after {} iterations. Total posts collected: {}",
            progress.iterations(),
            store.len()
        );
        if restricted > 0 {
            tracing::warn!(
                "Found {} restricted posts that require a logged-in session to view",
                restricted
            );
        }

        let mut posts = store.into_sorted();
        if let Some(cap) = cap {
            posts.truncate(cap);
        }

        Ok(CrawlOutcome {
            channel: channel.unwrap_or_else(Channel::unknown),
            posts,
            stop_reason,
            iterations: progress.iterations(),
            restricted,
        })
    }
}

/// Reads the rendering's scroll marker; unreadable markers yield `None`
async fn measure_position<S>(session: &mut S, rendering: Rendering) -> Option<f64>
where
    S: BrowserSession + ?Sized,
{
    match session.evaluate(rendering.position_script()).await {
        Ok(value) => value.as_f64(),
        Err(e) => {
            tracing::debug!("Could not measure scroll position: {}", e);
            None
        }
    }
}
