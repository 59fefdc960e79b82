//! Record extraction from rendered feed markup
//!
//! # Components
//!
//! - `strategy`: rendering classification and per-rendering selector tables
//! - `post`: region-to-record mapping
//! - `body`: content flattening and sentinel bodies
//! - `channel`: channel-level metadata
//! - `numeric`: abbreviated count parsing (`"1.2K"` -> 1200)
//! - `timestamp`: best-effort date parsing
//!
//! Extraction is a pure function of the markup and the clock: it performs no
//! I/O and never fails. Regions that cannot be mapped are skipped and counted.

mod body;
mod channel;
mod numeric;
mod post;
mod strategy;
mod timestamp;

pub use body::{restricted_sentinel, EMPTY_POST, NO_TEXT_CONTENT};
pub use numeric::{parse_count, parse_subscriber_count};
pub use post::{id_from_permalink, split_reaction, SkipReason};
pub use strategy::{Rendering, Strategy};
pub use timestamp::{parse_timestamp, parse_unix_seconds};

use crate::records::{Channel, Post};
use chrono::{DateTime, Utc};
use scraper::Html;

/// Everything one extraction pass produced
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    pub rendering: Rendering,

    /// Name of the strategy that found regions, if any did
    pub strategy: Option<&'static str>,

    pub channel: Channel,

    /// Records in document order
    pub posts: Vec<Post>,

    /// Number of regions that could not be mapped
    pub skipped: usize,
}

/// Extracts channel metadata and records from a page snapshot
///
/// # Arguments
///
/// * `html` - The page's current serialized markup
/// * `fallback_handle` - Handle to use when the page names none
///
/// # Returns
///
/// The extracted page. Missing data degrades to defaults; this never fails.
pub fn extract_page(html: &str, fallback_handle: Option<&str>) -> ExtractedPage {
    extract_page_at(html, fallback_handle, Utc::now())
}

/// Like [`extract_page`], with an explicit extraction time
pub fn extract_page_at(
    html: &str,
    fallback_handle: Option<&str>,
    now: DateTime<Utc>,
) -> ExtractedPage {
    let document = Html::parse_document(html);
    let rendering = Rendering::classify(&document);
    let channel = channel::extract_channel(&document, rendering, fallback_handle);

    let selected = rendering
        .strategies()
        .iter()
        .map(|strategy| (strategy.name, strategy.regions(&document)))
        .find(|(_, regions)| !regions.is_empty());

    let Some((strategy, regions)) = selected else {
        tracing::debug!("No {} strategy matched any region", rendering);
        return ExtractedPage {
            rendering,
            strategy: None,
            channel,
            posts: Vec::new(),
            skipped: 0,
        };
    };

    tracing::trace!(
        "Strategy {} matched {} regions ({})",
        strategy,
        regions.len(),
        rendering
    );

    let mut posts = Vec::with_capacity(regions.len());
    let mut skipped = 0;
    for region in regions {
        match post::extract_post(region, rendering.layout(), now, &channel.name) {
            Ok(post) => {
                if post.synthetic_id {
                    tracing::debug!(
                        "Synthesized identifier {} for a region without one",
                        post.id
                    );
                }
                posts.push(post);
            }
            Err(SkipReason::Malformed(reason)) => {
                tracing::warn!("Skipping region: {}", reason);
                skipped += 1;
            }
            Err(reason) => {
                tracing::trace!("Skipping region: {}", reason);
                skipped += 1;
            }
        }
    }

    ExtractedPage {
        rendering,
        strategy: Some(strategy),
        channel,
        posts,
        skipped,
    }
}
