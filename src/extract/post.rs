//! Region-to-record mapping
//!
//! Each field has its own small extractor that walks the layout's selector
//! table in order and falls back to a fixed default.

use super::body::{extract_body, is_blank};
use super::numeric::parse_count;
use super::strategy::Layout;
use super::timestamp::{parse_timestamp, parse_unix_seconds};
use crate::records::{MediaType, Post, Reaction};
use chrono::{DateTime, Utc};
use rand::Rng;
use regex::{Regex, RegexSet};
use scraper::ElementRef;
use std::fmt;
use std::sync::LazyLock;

static HANDLE_PERMALINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"t(?:elegram)?\.me/(?:s/)?([A-Za-z0-9_]+)/(\d+)/?(?:[?#].*)?$")
        .expect("hardcoded regex pattern is valid")
});

static NUMERIC_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(\d+)/?(?:[?#].*)?$").expect("hardcoded regex pattern is valid")
});

/// Text the logged-in application renders in message-like containers that
/// are not posts (menus, folder tabs, version banners).
static UI_CHROME: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)^Mark all as read$",
        r"(?i)^New Channel.*New Group.*New Message$",
        r"(?i)^All Chats.*Private Chats.*Group Chats.*Channels$",
        r"(?i)Add Account.*Saved Messages.*Contacts",
        r"(?i)Telegram Web.*Version",
        r"(?i)^Popular.*Emoji.*Add\+",
        r"(?i)Install App.*Switch to.*Version",
        r"(?i)Night Mode.*animations.*Telegram Features",
        r"^[A-Z]{3,}[A-Z]{3,}",
    ])
    .expect("hardcoded regex patterns are valid")
});

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Why a candidate region produced no record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The region is application chrome, not a post
    UiChrome,

    /// The region carries neither text nor media
    Blank,

    /// The region carries an identifier attribute that cannot be used
    Malformed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UiChrome => write!(f, "application chrome"),
            Self::Blank => write!(f, "blank region"),
            Self::Malformed(reason) => write!(f, "malformed region: {}", reason),
        }
    }
}

/// Builds one post from a candidate region
///
/// `now` is the extraction time used when the region has no timestamp.
pub(crate) fn extract_post(
    region: ElementRef,
    layout: &Layout,
    now: DateTime<Utc>,
    fallback_channel: &str,
) -> Result<Post, SkipReason> {
    let (id, synthetic_id) = match extract_id(region, layout)? {
        Some(id) => (id, false),
        None => (synthesize_id(now), true),
    };

    let media_types = detect_media(region, layout);
    let content = extract_body(region, layout, &media_types);
    let has_media = !media_types.is_empty()
        || layout
            .media_marker
            .as_ref()
            .is_some_and(|marker| region.select(marker).next().is_some());

    if layout.skip_blank {
        if is_blank(&content) && !has_media {
            return Err(SkipReason::Blank);
        }
        if UI_CHROME.is_match(&content) {
            return Err(SkipReason::UiChrome);
        }
    }

    let channel_name = layout
        .owner_name
        .as_ref()
        .and_then(|selector| region.select(selector).next())
        .map(|owner| owner.text().collect::<String>().trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| fallback_channel.to_string());

    Ok(Post {
        id,
        synthetic_id,
        date: extract_date(region, layout).unwrap_or(now),
        content,
        views: extract_views(region, layout),
        reactions: extract_reactions(region, layout),
        has_media,
        media_types,
        channel_name,
    })
}

/// Identifier from a data attribute, then from a permalink
///
/// `Ok(None)` means the region has no identifier at all and one must be
/// synthesized.
fn extract_id(region: ElementRef, layout: &Layout) -> Result<Option<String>, SkipReason> {
    let direct = layout
        .id_attrs
        .iter()
        .find_map(|attr| region.value().attr(attr))
        .or_else(|| {
            layout
                .nested_id
                .as_ref()
                .and_then(|selector| region.select(selector).next())
                .and_then(|nested| nested.value().attr("data-mid"))
        });

    if let Some(raw) = direct {
        let id = raw.trim();
        if id.is_empty() || id.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(SkipReason::Malformed(format!(
                "unusable identifier attribute {:?}",
                raw
            )));
        }
        return Ok(Some(id.to_string()));
    }

    Ok(layout
        .permalink
        .iter()
        .filter_map(|selector| region.select(selector).next())
        .filter_map(|link| link.value().attr("href"))
        .find_map(id_from_permalink))
}

/// Parses `.../<handle>/<n>` into `"<handle>/<n>"` (the embed's `data-post`
/// shape), or any other `.../<n>` into `"<n>"`
pub fn id_from_permalink(href: &str) -> Option<String> {
    if let Some(caps) = HANDLE_PERMALINK_RE.captures(href) {
        return Some(format!("{}/{}", &caps[1], &caps[2]));
    }
    NUMERIC_SUFFIX_RE
        .captures(href)
        .map(|caps| caps[1].to_string())
}

/// `msg_<millis>_<9 base36 chars>`; unique but unstable across passes
fn synthesize_id(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("msg_{}_{}", now.timestamp_millis(), suffix)
}

fn extract_date(region: ElementRef, layout: &Layout) -> Option<DateTime<Utc>> {
    if let Some(attr) = layout.unix_attr {
        let raw = region.value().attr(attr).or_else(|| {
            layout
                .nested_id
                .as_ref()
                .and_then(|selector| region.select(selector).next())
                .and_then(|nested| nested.value().attr(attr))
        });
        if let Some(date) = raw.and_then(parse_unix_seconds) {
            return Some(date);
        }
    }

    let machine = layout
        .datetime
        .iter()
        .filter_map(|selector| region.select(selector).next())
        .filter_map(|element| element.value().attr("datetime"))
        .find_map(parse_timestamp);
    if machine.is_some() {
        return machine;
    }

    layout
        .title_time
        .iter()
        .filter_map(|selector| region.select(selector).next())
        .filter_map(|element| element.value().attr("title"))
        .find_map(parse_timestamp)
}

fn extract_views(region: ElementRef, layout: &Layout) -> u64 {
    let direct = layout
        .views
        .iter()
        .filter_map(|selector| region.select(selector).next())
        .map(|element| element.text().collect::<String>())
        .find(|text| !text.trim().is_empty());

    let text = direct.or_else(|| {
        layout
            .views_suffixed
            .iter()
            .flat_map(|selector| region.select(selector))
            .map(|element| element.text().collect::<String>())
            .find(|text| text.contains('K') || text.contains('M'))
    });

    text.map(|text| parse_count(&text)).unwrap_or(0)
}

fn extract_reactions(region: ElementRef, layout: &Layout) -> Vec<Reaction> {
    let mut reactions = Vec::new();

    for selector in &layout.reactions {
        for fragment in region.select(selector) {
            let full = fragment.text().collect::<String>();
            let (split_symbol, split_count) = split_reaction(&full);

            let symbol = layout
                .reaction_symbol
                .as_ref()
                .and_then(|s| fragment.select(s).next())
                .map(|e| e.text().collect::<String>().trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| split_symbol.to_string());

            let count_text = layout
                .reaction_count
                .as_ref()
                .and_then(|s| fragment.select(s).next())
                .map(|e| e.text().collect::<String>())
                .unwrap_or_else(|| split_count.to_string());

            let count = parse_count(&count_text);
            if !symbol.is_empty() && count > 0 {
                reactions.push(Reaction {
                    emoji: symbol,
                    count,
                });
            }
        }
    }

    reactions
}

/// Splits `"🔥 1.2K"` into `("🔥", "1.2K")` at the first ASCII digit
pub fn split_reaction(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.find(|c: char| c.is_ascii_digit()) {
        Some(index) => (text[..index].trim(), text[index..].trim()),
        None => (text, ""),
    }
}

fn detect_media(region: ElementRef, layout: &Layout) -> Vec<MediaType> {
    layout
        .media
        .iter()
        .filter(|(_, selector)| region.select(selector).next().is_some())
        .map(|(kind, _)| *kind)
        .collect()
}
