//! Rendering classification and selector tables
//!
//! The same feed is served in two structurally different shapes. Each shape
//! gets an ordered list of named region strategies (the first one that finds
//! anything wins the pass) and a `Layout`: the selector tables the
//! per-field sub-extractors consult, in priority order.

use crate::records::MediaType;
use crate::session::ScrollTarget;
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use std::sync::LazyLock;

/// Scrollable message container in the web application
const APP_SCROLLER: &str = ".bubbles-inner, .messages-container, .bubbles";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("hardcoded selector is valid")
}

fn selectors(list: &[&str]) -> Vec<Selector> {
    list.iter().map(|css| selector(css)).collect()
}

/// Structurally distinct renderings of a channel feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rendering {
    /// The unauthenticated `t.me/s/<handle>` page
    PublicEmbed,

    /// The logged-in web application
    Authenticated,
}

impl Rendering {
    /// Classifies a parsed document
    ///
    /// The application wraps messages in bubble containers; the public embed
    /// never does.
    pub fn classify(document: &Html) -> Self {
        if document.select(&APP_MARKER).next().is_some() {
            Self::Authenticated
        } else {
            Self::PublicEmbed
        }
    }

    /// Region strategies for this rendering, in priority order
    pub fn strategies(&self) -> &'static [Strategy] {
        match self {
            Self::PublicEmbed => EMBED_STRATEGIES.as_slice(),
            Self::Authenticated => APP_STRATEGIES.as_slice(),
        }
    }

    /// Selector tables for this rendering
    pub(crate) fn layout(&self) -> &'static Layout {
        match self {
            Self::PublicEmbed => &EMBED_LAYOUT,
            Self::Authenticated => &APP_LAYOUT,
        }
    }

    /// Where to scroll to make the feed load older posts
    pub fn scroll_target(&self) -> ScrollTarget {
        match self {
            Self::PublicEmbed => ScrollTarget::WindowTop,
            Self::Authenticated => ScrollTarget::ElementTop(APP_SCROLLER.to_string()),
        }
    }

    /// JavaScript that measures the current scroll marker
    pub fn position_script(&self) -> &'static str {
        match self {
            Self::PublicEmbed => "window.pageYOffset",
            Self::Authenticated => {
                "(() => { const c = document.querySelector('.bubbles-inner, .messages-container, .bubbles'); \
                 return c ? c.scrollHeight : window.pageYOffset; })()"
            }
        }
    }
}

impl fmt::Display for Rendering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PublicEmbed => write!(f, "public-embed"),
            Self::Authenticated => write!(f, "authenticated"),
        }
    }
}

/// A named structural query for candidate post regions
pub struct Strategy {
    pub name: &'static str,
    region: Selector,
    /// A descendant every accepted region must contain
    requires: Option<Selector>,
}

impl Strategy {
    fn new(name: &'static str, region: &str, requires: Option<&str>) -> Self {
        Self {
            name,
            region: selector(region),
            requires: requires.map(selector),
        }
    }

    /// Returns the matching regions in document order
    pub fn regions<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        document
            .select(&self.region)
            .filter(|region| match &self.requires {
                Some(required) => region.select(required).next().is_some(),
                None => true,
            })
            .collect()
    }
}

/// Per-rendering selector tables consumed by the sub-extractors
pub(crate) struct Layout {
    /// Attributes on the region carrying the identifier directly
    pub id_attrs: &'static [&'static str],
    /// Descendant carrying `data-mid`
    pub nested_id: Option<Selector>,
    /// Elements whose `href` ends in the post number
    pub permalink: Vec<Selector>,

    /// Attribute (on the region or a nested message) holding unix seconds
    pub unix_attr: Option<&'static str>,
    /// Elements carrying a `datetime` attribute
    pub datetime: Vec<Selector>,
    /// Elements carrying a human-readable `title`
    pub title_time: Vec<Selector>,

    pub content: Vec<Selector>,
    /// Descendants skipped while flattening content
    pub noise: Vec<Selector>,
    pub restricted: Vec<Selector>,
    pub sensitive: Vec<Selector>,
    pub captions: Vec<Selector>,
    pub forwarded: Vec<Selector>,
    pub bubble: Vec<Selector>,

    pub views: Vec<Selector>,
    /// Info spans that only count as views when they carry a K/M suffix
    pub views_suffixed: Vec<Selector>,

    pub reactions: Vec<Selector>,
    pub reaction_symbol: Option<Selector>,
    pub reaction_count: Option<Selector>,

    pub media: Vec<(MediaType, Selector)>,
    /// Generic attachment marker for `has_media`
    pub media_marker: Option<Selector>,

    pub owner_name: Option<Selector>,

    /// Drop regions that carry neither text nor media
    pub skip_blank: bool,
}

static APP_MARKER: LazyLock<Selector> =
    LazyLock::new(|| selector(".bubbles, .messages-container, .bubble"));

static EMBED_STRATEGIES: LazyLock<Vec<Strategy>> = LazyLock::new(|| {
    vec![
        Strategy::new("widget-message", ".tgme_widget_message", None),
        Strategy::new("channel-history", ".tgme_channel_history .message", None),
    ]
});

static APP_STRATEGIES: LazyLock<Vec<Strategy>> = LazyLock::new(|| {
    vec![
        Strategy::new("spoilers-message", ".message.spoilers-container", None),
        Strategy::new("bubble", ".bubble", Some(".bubble-content")),
        Strategy::new(
            "content-wrapper-message",
            ".message",
            Some(".message-content-wrapper"),
        ),
        Strategy::new("data-mid", "[data-mid]", None),
    ]
});

static EMBED_LAYOUT: LazyLock<Layout> = LazyLock::new(|| Layout {
    id_attrs: &["data-post"],
    nested_id: None,
    permalink: selectors(&["a.tgme_widget_message_date[href]", ".js-message_date[href]"]),

    unix_attr: None,
    datetime: selectors(&[".tgme_widget_message_date time[datetime]", "time[datetime]"]),
    title_time: selectors(&[".tgme_widget_message_date[title]", "time[title]"]),

    content: selectors(&[".tgme_widget_message_text", ".js-message_text", ".message_text"]),
    noise: Vec::new(),
    restricted: selectors(&[".tgme_widget_message_error"]),
    sensitive: selectors(&[".tgme_widget_message_sensitive"]),
    captions: selectors(&[
        ".tgme_widget_message_photo_caption",
        ".tgme_widget_message_video_caption",
    ]),
    forwarded: selectors(&[".tgme_widget_message_forwarded_from"]),
    bubble: selectors(&[".tgme_widget_message_bubble"]),

    views: selectors(&[".tgme_widget_message_views", ".js-message_views"]),
    views_suffixed: selectors(&[".tgme_widget_message_info span"]),

    reactions: selectors(&[".js-message_reaction, .tgme_widget_message_reaction"]),
    reaction_symbol: None,
    reaction_count: None,

    media: vec![
        (
            MediaType::Photo,
            selector(".tgme_widget_message_photo, .tgme_widget_message_photo_wrap"),
        ),
        (
            MediaType::Video,
            selector(".tgme_widget_message_video, .tgme_widget_message_video_player"),
        ),
        (MediaType::Audio, selector(".tgme_widget_message_voice")),
        (MediaType::Document, selector(".tgme_widget_message_document")),
        (MediaType::Poll, selector(".tgme_widget_message_poll")),
        (MediaType::Location, selector(".tgme_widget_message_location")),
    ],
    media_marker: None,

    owner_name: Some(selector(".tgme_widget_message_owner_name")),

    skip_blank: false,
});

static APP_LAYOUT: LazyLock<Layout> = LazyLock::new(|| Layout {
    id_attrs: &["data-msg-id", "data-message-id", "data-mid"],
    nested_id: Some(selector("[data-mid]")),
    permalink: selectors(&[".time[href]", ".message-time[href]"]),

    unix_attr: Some("data-timestamp"),
    datetime: selectors(&[
        ".time[datetime]",
        ".message-time[datetime]",
        ".bubble-time[datetime]",
        "time[datetime]",
    ]),
    title_time: selectors(&[
        ".time[title]",
        ".message-time[title]",
        ".bubble-time[title]",
        ".time-inner[title]",
    ]),

    content: selectors(&[
        ".message-content-wrapper .text-content",
        ".bubble-content .message",
        ".bubble-content-wrapper .text",
        ".message-content .text",
        ".spoilers-container .text-content",
        ".message-text",
        "[data-message-text]",
    ]),
    noise: selectors(&[
        ".time",
        ".message-time",
        ".bubble-time",
        ".time-inner",
        ".reactions",
        ".views",
        ".message-views",
        ".post-views",
    ]),
    restricted: Vec::new(),
    sensitive: Vec::new(),
    captions: selectors(&[".caption", ".media-caption"]),
    forwarded: selectors(&[".forwarded", ".forward-from"]),
    bubble: Vec::new(),

    views: selectors(&[".views", ".message-views", ".post-views"]),
    views_suffixed: Vec::new(),

    reactions: selectors(&[".reaction, .reactions-item, .message-reaction"]),
    reaction_symbol: Some(selector(".reaction-emoji, .emoji")),
    reaction_count: Some(selector(".reaction-count, .count")),

    media: vec![
        (MediaType::Photo, selector(".photo, .media-photo, img.media")),
        (MediaType::Video, selector(".video, .media-video, video")),
        (MediaType::Audio, selector(".audio, .voice, audio")),
        (MediaType::Document, selector(".document, .media-document, .file")),
        (MediaType::Poll, selector(".poll")),
        (MediaType::Location, selector(".location, .geo")),
    ],
    media_marker: Some(selector(".media, .attachment")),

    owner_name: None,

    skip_blank: true,
});
