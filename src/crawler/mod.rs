//! Crawler module: opening a channel feed and scrolling it to exhaustion
//!
//! This module contains:
//! - Target navigation with public URL fallbacks and the authenticated flow
//! - The per-crawl deduplication store
//! - Termination heuristics and the memory guard
//! - The scroll loop itself
//! - The `scrape` entry point, which reports every failure in-band

mod coordinator;
mod guard;
mod navigator;
mod store;
mod termination;

pub use coordinator::{effective_cap, CrawlOutcome, DateBounds, ScrollCrawler, UNBOUNDED_CAP};
pub use guard::{MemoryProbe, ResourceGuard, SystemProbe};
pub use navigator::{CrawlMode, Navigator};
pub use store::DeduplicationStore;
pub use termination::{CrawlProgress, StopReason, TerminationPolicy};

use crate::config::Config;
use crate::records::{Channel, Post};
use crate::session::{BrowserSession, Credentials};
use crate::target::resolve_target;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One crawl invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    /// Channel handle or link
    pub target: String,

    #[serde(default)]
    pub date_from: Option<DateTime<Utc>>,

    #[serde(default)]
    pub date_to: Option<DateTime<Utc>>,

    /// Record cap; `None` means unbounded, and only `0 < cap < 10 000`
    /// limits the crawl
    #[serde(default)]
    pub max_posts: Option<usize>,

    #[serde(default = "default_include_reactions")]
    pub include_reactions: bool,

    #[serde(default)]
    pub mode: CrawlMode,

    #[serde(default)]
    pub credentials: Option<Credentials>,
}

fn default_include_reactions() -> bool {
    true
}

impl ScrapeRequest {
    /// A public-mode request with no bounds and the default cap
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            date_from: None,
            date_to: None,
            max_posts: None,
            include_reactions: true,
            mode: CrawlMode::Public,
            credentials: None,
        }
    }
}

/// Result of one crawl invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    pub channel: Channel,

    /// Records newest first
    pub posts: Vec<Post>,

    pub scraped_at: DateTime<Utc>,
    pub total_posts: usize,

    /// True when the crawl stopped before the feed was exhausted for a
    /// reason other than its own limits. A partial result is not an error.
    #[serde(default)]
    pub partial: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScrapeResult {
    /// The result reported when a crawl fails outright
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            channel: Channel::unknown(),
            posts: Vec::new(),
            scraped_at: Utc::now(),
            total_posts: 0,
            partial: false,
            stop_reason: None,
            error: Some(message.into()),
        }
    }

    fn from_outcome(outcome: CrawlOutcome, include_reactions: bool) -> Self {
        let mut posts = outcome.posts;
        if !include_reactions {
            for post in &mut posts {
                post.reactions.clear();
            }
        }
        Self {
            channel: outcome.channel,
            total_posts: posts.len(),
            posts,
            scraped_at: Utc::now(),
            partial: outcome.stop_reason.is_partial(),
            stop_reason: Some(outcome.stop_reason),
            error: None,
        }
    }
}

/// Runs a complete crawl over `session`
///
/// This is the main entry point. It will:
/// 1. Resolve the target into a channel handle
/// 2. Open the feed (public formats or the authenticated flow)
/// 3. Scroll and extract until a stop condition fires
/// 4. Sort, truncate and package the records
///
/// # Arguments
///
/// * `session` - The browser session to drive; held for the whole crawl
/// * `config` - Loaded configuration
/// * `request` - What to crawl
///
/// # Returns
///
/// Always a `ScrapeResult`. Failing to open the feed is reported in its
/// `error` field with the unknown channel and no posts; a crawl cut short
/// afterwards keeps its posts and is marked `partial` instead.
pub async fn scrape<S>(session: &mut S, config: &Config, request: &ScrapeRequest) -> ScrapeResult
where
    S: BrowserSession + ?Sized,
{
    scrape_with_guard(session, config, request, ResourceGuard::system(&config.guard)).await
}

/// Runs a complete crawl with a caller-supplied memory guard
///
/// Same as [`scrape`], for callers that sample memory their own way.
pub async fn scrape_with_guard<S>(
    session: &mut S,
    config: &Config,
    request: &ScrapeRequest,
    guard: ResourceGuard,
) -> ScrapeResult
where
    S: BrowserSession + ?Sized,
{
    match try_scrape(session, config, request, guard).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Scraping {} failed: {}", request.target, e);
            ScrapeResult::failed(e.to_string())
        }
    }
}

async fn try_scrape<S>(
    session: &mut S,
    config: &Config,
    request: &ScrapeRequest,
    guard: ResourceGuard,
) -> Result<ScrapeResult>
where
    S: BrowserSession + ?Sized,
{
    let target = resolve_target(&request.target)?;
    tracing::info!("Starting scrape of {} ({:?} mode)", target, request.mode);

    let url = Navigator::new(config)
        .open(session, &target, request.mode, request.credentials.as_ref())
        .await?;
    tracing::debug!("Feed open at {}", url);

    let outcome = ScrollCrawler::new(session, config)
        .with_guard(guard)
        .with_date_bounds(DateBounds {
            from: request.date_from,
            to: request.date_to,
        })
        .with_count_cap(request.max_posts)
        .with_fallback_handle(target.handle())
        .run()
        .await?;

    tracing::info!(
        "Scraping complete. Total posts: {} ({})",
        outcome.posts.len(),
        outcome.stop_reason
    );
    Ok(ScrapeResult::from_outcome(outcome, request.include_reactions))
}
