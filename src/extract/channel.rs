//! Channel metadata extraction

use super::numeric::{parse_count, parse_subscriber_count};
use super::strategy::Rendering;
use crate::records::{Channel, UNKNOWN_CHANNEL_NAME, UNKNOWN_HANDLE};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

static HANDLE_IN_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"t(?:elegram)?\.me/(?:s/)?([^/?#'\s]+)").expect("hardcoded regex pattern is valid")
});

static SCRIPT_LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"window\.location\.href.*?t\.me/(?:s/)?([^/?#'"\s]+)"#)
        .expect("hardcoded regex pattern is valid")
});

struct ChannelSelectors {
    name: Vec<Selector>,
    description: Vec<Selector>,
    counters: Vec<Selector>,
    photo: Vec<Selector>,
    verified: Selector,
    header_handle: Option<Selector>,
}

fn parse(list: &[&str]) -> Vec<Selector> {
    list.iter()
        .map(|css| Selector::parse(css).expect("hardcoded selector is valid"))
        .collect()
}

static EMBED_CHANNEL: LazyLock<ChannelSelectors> = LazyLock::new(|| ChannelSelectors {
    name: parse(&[
        ".tgme_page_title",
        ".tgme_channel_info_header_title",
        ".tgme_header_title",
    ]),
    description: parse(&[".tgme_page_description", ".tgme_channel_info_description"]),
    counters: parse(&[
        ".tgme_page_extra",
        ".tgme_channel_info_counters",
        ".tgme_header_counter",
    ]),
    photo: parse(&[
        ".tgme_page_photo_image img[src]",
        ".tgme_channel_info_header_photo img[src]",
    ]),
    verified: parse(&[".verified-icon, .tgme_channel_info_header_verified"]).remove(0),
    header_handle: parse(&[".tgme_channel_info_header_username"]).pop(),
});

static APP_CHANNEL: LazyLock<ChannelSelectors> = LazyLock::new(|| ChannelSelectors {
    name: parse(&[".chat-info-name", ".peer-title", ".chatlist-chat-title", "h1"]),
    description: parse(&[".chat-info-description", ".peer-description"]),
    counters: parse(&[".chat-info-subscribers", ".peer-subscribers"]),
    photo: parse(&[".chat-info .avatar img[src]", ".peer-avatar img[src]"]),
    verified: parse(&[".verified"]).remove(0),
    header_handle: None,
});

static OG_URL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="og:url"]"#).expect("hardcoded selector is valid")
});
static SCRIPT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("hardcoded selector is valid"));
static TME_ANCHOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a[href*="t.me"]"#).expect("hardcoded selector is valid")
});

/// Extracts channel metadata from a parsed document
///
/// # Arguments
///
/// * `document` - The parsed page
/// * `rendering` - The page's classified rendering
/// * `fallback_handle` - Handle derived from the requested URL, used when the
///   document names none
pub(crate) fn extract_channel(
    document: &Html,
    rendering: Rendering,
    fallback_handle: Option<&str>,
) -> Channel {
    let selectors: &ChannelSelectors = match rendering {
        Rendering::PublicEmbed => &EMBED_CHANNEL,
        Rendering::Authenticated => &APP_CHANNEL,
    };

    let username = extract_handle(document, selectors)
        .or_else(|| fallback_handle.map(str::to_string))
        .unwrap_or_else(|| UNKNOWN_HANDLE.to_string());

    let name = first_text(document, &selectors.name)
        .filter(|name| name != UNKNOWN_CHANNEL_NAME)
        .unwrap_or_else(|| {
            if username == UNKNOWN_HANDLE {
                UNKNOWN_CHANNEL_NAME.to_string()
            } else {
                username.clone()
            }
        });

    let subscriber_count = first_text(document, &selectors.counters).and_then(|text| {
        match rendering {
            Rendering::PublicEmbed => parse_subscriber_count(&text),
            Rendering::Authenticated => Some(parse_count(&text)).filter(|count| *count > 0),
        }
    });

    let photo_url = selectors
        .photo
        .iter()
        .filter_map(|selector| document.select(selector).next())
        .find_map(|img| img.value().attr("src"))
        .map(str::to_string);

    Channel {
        name,
        username,
        description: first_text(document, &selectors.description),
        subscriber_count,
        verified: document.select(&selectors.verified).next().is_some(),
        photo_url,
    }
}

fn extract_handle(document: &Html, selectors: &ChannelSelectors) -> Option<String> {
    let og_url = document
        .select(&OG_URL)
        .filter_map(|meta| meta.value().attr("content"))
        .find_map(handle_from_url);
    if og_url.is_some() {
        return og_url;
    }

    let scripts: String = document.select(&SCRIPT).flat_map(|s| s.text()).collect();
    if let Some(caps) = SCRIPT_LOCATION_RE.captures(&scripts) {
        return Some(caps[1].to_string());
    }

    let anchor = document
        .select(&TME_ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .find_map(handle_from_url);
    if anchor.is_some() {
        return anchor;
    }

    selectors
        .header_handle
        .as_ref()
        .and_then(|selector| document.select(selector).next())
        .map(|header| header.text().collect::<String>())
        .and_then(|text| text.trim().strip_prefix('@').map(str::to_string))
        .filter(|handle| !handle.is_empty())
}

fn handle_from_url(url: &str) -> Option<String> {
    HANDLE_IN_URL_RE
        .captures(url)
        .map(|caps| caps[1].to_string())
        .filter(|handle| handle != "s")
}

fn first_text(document: &Html, selectors: &[Selector]) -> Option<String> {
    selectors
        .iter()
        .filter_map(|selector| document.select(selector).next())
        .map(|element| element.text().collect::<String>().trim().to_string())
        .find(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embed(html: &str, fallback: Option<&str>) -> Channel {
        extract_channel(&Html::parse_document(html), Rendering::PublicEmbed, fallback)
    }

    #[test]
    fn test_embed_header() {
        let channel = embed(
            r#"<html><head><meta property="og:url" content="https://t.me/s/durov"></head><body>
                <div class="tgme_channel_info_header_title"><span>Durov's Channel</span></div>
                <i class="verified-icon"></i>
                <div class="tgme_channel_info_header_photo"><img src="https://cdn.example/p.jpg"></div>
                <div class="tgme_channel_info_description">Thoughts</div>
                <div class="tgme_channel_info_counters"><span>12.4K subscribers</span></div>
            </body></html>"#,
            None,
        );
        assert_eq!(channel.name, "Durov's Channel");
        assert_eq!(channel.username, "durov");
        assert_eq!(channel.description.as_deref(), Some("Thoughts"));
        assert_eq!(channel.subscriber_count, Some(12_400));
        assert!(channel.verified);
        assert_eq!(channel.photo_url.as_deref(), Some("https://cdn.example/p.jpg"));
    }

    #[test]
    fn test_handle_from_anchor_skips_bare_s() {
        let channel = embed(
            r#"<a href="https://t.me/s/">x</a><a href="https://t.me/news_chan/5">y</a>"#,
            None,
        );
        assert_eq!(channel.username, "news_chan");
    }

    #[test]
    fn test_handle_from_script_location() {
        let channel = embed(
            r#"<script>if (x) { window.location.href = 'https://t.me/s/scripted'; }</script>"#,
            None,
        );
        assert_eq!(channel.username, "scripted");
    }

    #[test]
    fn test_handle_from_header_username() {
        let channel = embed(
            r#"<div class="tgme_channel_info_header_username"><a>@header_handle</a></div>"#,
            None,
        );
        assert_eq!(channel.username, "header_handle");
    }

    #[test]
    fn test_fallbacks() {
        let channel = embed("<html><body></body></html>", Some("from_url"));
        assert_eq!(channel.username, "from_url");
        assert_eq!(channel.name, "from_url");
        assert_eq!(channel.subscriber_count, None);
        assert!(!channel.verified);

        let unknown = embed("<html><body></body></html>", None);
        assert_eq!(unknown.username, UNKNOWN_HANDLE);
        assert_eq!(unknown.name, UNKNOWN_CHANNEL_NAME);
        assert!(unknown.has_unknown_handle());
    }

    #[test]
    fn test_application_header() {
        let document = Html::parse_document(
            r#"<div class="chat-info"><span class="peer-title">App Chan</span>
               <span class="chat-info-subscribers">5.3K subscribers</span><span class="verified"></span></div>
               <div class="bubbles"></div>"#,
        );
        let channel = extract_channel(&document, Rendering::Authenticated, Some("appchan"));
        assert_eq!(channel.name, "App Chan");
        assert_eq!(channel.username, "appchan");
        assert_eq!(channel.subscriber_count, Some(5300));
        assert!(channel.verified);
    }
}
