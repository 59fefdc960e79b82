//! Body text extraction
//!
//! Content containers are flattened to plain text with a light markdown
//! flavour: `<br>` becomes a newline, `<pre>` a fenced block, `<code>` an
//! inline span, and anchors whose text survives flattening become
//! `[text](href)`. When no container exists the post is described by a
//! bracketed sentinel instead.

use super::strategy::Layout;
use crate::records::MediaType;
use scraper::{ElementRef, Node, Selector};
use std::sync::LazyLock;

/// Body of a post whose text container is present but empty
pub const NO_TEXT_CONTENT: &str = "[No text content]";

/// Body of a post with no text, media or notice of any kind
pub const EMPTY_POST: &str = "[Empty post]";

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("hardcoded selector is valid"));

/// Produces the body text for a region
///
/// `media` is the already-detected media kinds, used by the sentinels.
pub(crate) fn extract_body(region: ElementRef, layout: &Layout, media: &[MediaType]) -> String {
    let mut container_found = false;
    for selector in &layout.content {
        if let Some(container) = region.select(selector).next() {
            container_found = true;
            let text = render_container(container, &layout.noise);
            if !text.is_empty() {
                return text;
            }
        }
    }
    if container_found {
        return NO_TEXT_CONTENT.to_string();
    }

    if first_text(region, &layout.restricted).is_some() {
        return restricted_sentinel(media);
    }

    if let Some(notice) = first_text(region, &layout.sensitive) {
        return format!("[Sensitive content: {}]", notice);
    }

    for selector in &layout.captions {
        if let Some(caption) = region.select(selector).next() {
            let text = render_container(caption, &layout.noise);
            if !text.is_empty() {
                return text;
            }
        }
    }

    if let Some(source) = first_text(region, &layout.forwarded) {
        let source = source
            .strip_prefix("Forwarded from")
            .map(str::trim)
            .unwrap_or(&source);
        return format!("[Forwarded from {}]", source);
    }

    if !media.is_empty() {
        return format!("[Media only: {}]", MediaType::join(media));
    }

    first_text(region, &layout.bubble).unwrap_or_else(|| EMPTY_POST.to_string())
}

/// Sentinel for posts the public page refuses to show
pub fn restricted_sentinel(media: &[MediaType]) -> String {
    if media.is_empty() {
        "[Restricted content: Please open Telegram to view this post]".to_string()
    } else {
        format!(
            "[Restricted content: {} - Please open Telegram to view]",
            MediaType::join(media)
        )
    }
}

/// Returns true for sentinels that mean "nothing here at all"
pub(crate) fn is_blank(body: &str) -> bool {
    body == NO_TEXT_CONTENT || body == EMPTY_POST
}

/// Trimmed text of the first element matching any selector, if non-empty
pub(crate) fn first_text(region: ElementRef, selectors: &[Selector]) -> Option<String> {
    selectors
        .iter()
        .filter_map(|selector| region.select(selector).next())
        .map(|element| element.text().collect::<String>().trim().to_string())
        .find(|text| !text.is_empty())
}

/// Flattens a content container and restores its links
fn render_container(container: ElementRef, noise: &[Selector]) -> String {
    let mut text = String::new();
    flatten_into(container, noise, &mut text);

    for anchor in container.select(&ANCHOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let label = anchor.text().collect::<String>();
        let label = label.trim();
        if label.is_empty() || !text.contains(label) {
            continue;
        }
        let link = format!("[{}]({})", label, href);
        if !text.contains(&link) {
            text = text.replacen(label, &link, 1);
        }
    }

    text.replace('\u{00A0}', " ").trim().to_string()
}

fn flatten_into(element: ElementRef, noise: &[Selector], out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                if noise.iter().any(|selector| selector.matches(&child)) {
                    continue;
                }
                match child.value().name() {
                    "br" => out.push('\n'),
                    "pre" => {
                        let mut code = String::new();
                        text_with_breaks(child, &mut code);
                        out.push_str("\n```\n");
                        out.push_str(&code);
                        out.push_str("\n```\n");
                    }
                    "code" => {
                        out.push('`');
                        out.extend(child.text());
                        out.push('`');
                    }
                    "script" | "style" => {}
                    _ => flatten_into(child, noise, out),
                }
            }
            _ => {}
        }
    }
}

fn text_with_breaks(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    if child.value().name() == "br" {
                        out.push('\n');
                    } else {
                        text_with_breaks(child, out);
                    }
                }
            }
            _ => {}
        }
    }
}
