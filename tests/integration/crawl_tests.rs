//! Integration tests for the crawler
//!
//! These tests drive the full scrape cycle against a scripted in-memory
//! browser session that serves a fixed sequence of page snapshots.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::VecDeque;
use std::time::Duration;
use telescroll::config::{Config, GuardConfig};
use telescroll::crawler::{
    scrape, scrape_with_guard, CrawlMode, MemoryProbe, ResourceGuard, ScrapeRequest,
    ScrollCrawler, StopReason,
};
use telescroll::records::UNKNOWN_HANDLE;
use telescroll::session::{
    BrowserSession, Credentials, Readiness, ScrollTarget, SessionCookie, SessionError,
    SessionResult,
};

/// Serves queued page snapshots; the last snapshot repeats once the queue
/// drains, unless the session is set to drop out at that point
struct ScriptedSession {
    pages: VecDeque<String>,
    current: String,
    refuse_navigation: bool,
    lost_when_drained: bool,
    scrolls: Vec<ScrollTarget>,
    visited: Vec<String>,
    position: f64,
}

impl ScriptedSession {
    fn new(pages: Vec<String>) -> Self {
        Self {
            pages: pages.into(),
            current: String::new(),
            refuse_navigation: false,
            lost_when_drained: false,
            scrolls: Vec::new(),
            visited: Vec::new(),
            position: 0.0,
        }
    }

    fn refusing() -> Self {
        Self {
            refuse_navigation: true,
            ..Self::new(Vec::new())
        }
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn navigate(
        &mut self,
        url: &str,
        _readiness: Readiness,
        _timeout: Duration,
    ) -> SessionResult<()> {
        self.visited.push(url.to_string());
        if self.refuse_navigation {
            Err(SessionError::Navigation(format!("{} is unreachable", url)))
        } else {
            Ok(())
        }
    }

    async fn content(&mut self) -> SessionResult<String> {
        match self.pages.pop_front() {
            Some(page) => self.current = page,
            None if self.lost_when_drained => return Err(SessionError::Closed),
            None => {}
        }
        Ok(self.current.clone())
    }

    async fn evaluate(&mut self, script: &str) -> SessionResult<serde_json::Value> {
        if script.contains("querySelector(") && script.ends_with("!== null") {
            return Ok(serde_json::Value::Bool(true));
        }
        // Keep the position moving so only the stall rule can fire
        self.position += 500.0;
        Ok(serde_json::json!(self.position))
    }

    async fn set_cookies(&mut self, _cookies: &[SessionCookie]) -> SessionResult<()> {
        Ok(())
    }

    async fn set_local_storage(&mut self, _entries: &[(String, String)]) -> SessionResult<()> {
        Ok(())
    }

    async fn scroll_to(&mut self, target: ScrollTarget) -> SessionResult<()> {
        self.scrolls.push(target);
        Ok(())
    }
}

/// Reports a fixed memory usage
struct FixedProbe(u64);

impl MemoryProbe for FixedProbe {
    fn resident_bytes(&mut self) -> Option<u64> {
        Some(self.0)
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.scraping.scroll_delay_ms = 0;
    config
}

/// A public embed message dated 2024-01-`day`
fn embed_message(id: u32, day: u32, text: &str) -> String {
    format!(
        r#"<div class="tgme_widget_message" data-post="testchan/{id}">
          <div class="tgme_widget_message_text">{text}</div>
          <div class="tgme_widget_message_reactions"><span class="tgme_widget_message_reaction">👍 {id}</span></div>
          <a class="tgme_widget_message_date" href="https://t.me/testchan/{id}"><time datetime="2024-01-{day:02}T12:00:00+00:00"></time></a>
          <span class="tgme_widget_message_views">1.5K</span>
        </div>"#
    )
}

fn embed_page(messages: &[(u32, u32)]) -> String {
    let body: String = messages
        .iter()
        .map(|(id, day)| embed_message(*id, *day, &format!("Post number {}", id)))
        .collect();
    format!(
        r#"<html><head><meta property="og:url" content="https://t.me/s/testchan"></head><body>
        <div class="tgme_channel_info_header_title">Test Channel</div>
        <div class="tgme_channel_history">{body}</div></body></html>"#
    )
}

#[tokio::test]
async fn test_overlapping_passes_collect_each_post_once() {
    let mut session = ScriptedSession::new(vec![
        embed_page(&[(1, 1), (2, 2)]),
        embed_page(&[(2, 2), (3, 3)]),
        embed_page(&[]),
        embed_page(&[]),
        embed_page(&[]),
    ]);
    let mut request = ScrapeRequest::new("@testchan");
    request.max_posts = Some(0);

    let result = scrape(&mut session, &test_config(), &request).await;

    assert_eq!(result.error, None);
    assert_eq!(result.stop_reason, Some(StopReason::Stalled));
    assert!(!result.partial);
    assert_eq!(result.channel.username, "testchan");
    assert_eq!(result.channel.name, "Test Channel");

    let ids: Vec<&str> = result.posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["testchan/3", "testchan/2", "testchan/1"]);
    assert_eq!(result.total_posts, 3);
    assert_eq!(result.posts[0].views, 1500);
    assert_eq!(result.posts[0].reactions.len(), 1);

    // Three stalled passes after the two productive ones
    assert_eq!(session.scrolls.len(), 4);
    assert!(session
        .scrolls
        .iter()
        .all(|s| *s == ScrollTarget::WindowTop));
    assert_eq!(session.visited, vec!["https://t.me/s/testchan"]);
}

#[tokio::test]
async fn test_count_cap_keeps_newest() {
    let mut session = ScriptedSession::new(vec![embed_page(&[(1, 1), (2, 2), (3, 3)])]);
    let mut request = ScrapeRequest::new("testchan");
    request.max_posts = Some(2);

    let result = scrape(&mut session, &test_config(), &request).await;

    assert_eq!(result.stop_reason, Some(StopReason::CountCapReached));
    let ids: Vec<&str> = result.posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["testchan/3", "testchan/2"]);
    assert_eq!(result.total_posts, 2);
    assert!(session.scrolls.is_empty());
}

#[tokio::test]
async fn test_date_bounds_filter_without_stopping() {
    let mut session = ScriptedSession::new(vec![
        embed_page(&[(1, 1), (2, 2), (3, 3), (4, 4), (5, 5)]),
        embed_page(&[]),
    ]);
    let mut request = ScrapeRequest::new("https://t.me/testchan");
    request.date_from = Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
    request.date_to = Some(Utc.with_ymd_and_hms(2024, 1, 4, 12, 0, 0).unwrap());

    let result = scrape(&mut session, &test_config(), &request).await;

    let ids: Vec<&str> = result.posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["testchan/4", "testchan/3", "testchan/2"]);
    assert_eq!(result.stop_reason, Some(StopReason::Stalled));
}

#[tokio::test]
async fn test_reactions_can_be_dropped() {
    let mut session = ScriptedSession::new(vec![embed_page(&[(7, 7)])]);
    let mut request = ScrapeRequest::new("testchan");
    request.include_reactions = false;

    let result = scrape(&mut session, &test_config(), &request).await;

    assert_eq!(result.posts.len(), 1);
    assert!(result.posts[0].reactions.is_empty());
}

#[tokio::test]
async fn test_navigation_failure_is_reported_in_band() {
    let mut session = ScriptedSession::refusing();
    let request = ScrapeRequest::new("testchan");

    let result = scrape(&mut session, &test_config(), &request).await;

    assert!(result.error.is_some());
    assert_eq!(result.channel.username, UNKNOWN_HANDLE);
    assert!(result.posts.is_empty());
    assert_eq!(result.total_posts, 0);
    assert_eq!(result.stop_reason, None);
    // Every public format, then the final embedded retry
    assert_eq!(session.visited.len(), 4);
}

#[tokio::test]
async fn test_invalid_target_is_reported_in_band() {
    let mut session = ScriptedSession::new(vec![embed_page(&[(1, 1)])]);
    let request = ScrapeRequest::new("https://example.com/testchan");

    let result = scrape(&mut session, &test_config(), &request).await;

    assert!(result.error.is_some());
    assert!(result.posts.is_empty());
    assert!(session.visited.is_empty());
}

#[tokio::test]
async fn test_authenticated_without_credentials_fails() {
    let mut session = ScriptedSession::new(Vec::new());
    let mut request = ScrapeRequest::new("testchan");
    request.mode = CrawlMode::Authenticated;

    let result = scrape(&mut session, &test_config(), &request).await;

    let error = result.error.expect("error is reported");
    assert!(error.contains("credentials"), "unexpected error: {}", error);
    assert!(session.visited.is_empty());
}

#[tokio::test]
async fn test_authenticated_rendering() {
    let page = r#"<html><body><div class="bubbles"><div class="bubbles-inner">
        <div class="bubble" data-mid="101"><div class="bubble-content"><div class="message-text">Older post</div></div></div>
        <div class="bubble" data-mid="102"><div class="bubble-content"><div class="message-text">Newer post</div></div></div>
        <div class="bubble" data-mid="103"><div class="bubble-content"><div class="message-text">Mark all as read</div></div></div>
        </div></div></body></html>"#;
    let mut session = ScriptedSession::new(vec![page.to_string()]);
    let mut request = ScrapeRequest::new("testchan");
    request.mode = CrawlMode::Authenticated;
    request.credentials = Some(Credentials {
        cookies: vec![SessionCookie {
            name: "stel_ssid".to_string(),
            value: "secret".to_string(),
            domain: ".telegram.org".to_string(),
            path: "/".to_string(),
            secure: true,
            http_only: true,
        }],
        local_storage: Vec::new(),
    });

    let result = scrape(&mut session, &test_config(), &request).await;

    assert_eq!(result.error, None);
    assert_eq!(result.channel.username, "testchan");
    let mut ids: Vec<&str> = result.posts.iter().map(|p| p.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["101", "102"]);
    assert!(result.posts.iter().all(|p| p.channel_name == "testchan"));
    assert!(matches!(
        session.scrolls.first(),
        Some(ScrollTarget::ElementTop(_))
    ));
}

#[tokio::test]
async fn test_memory_guard_stops_crawl_as_partial() {
    let mut session = ScriptedSession::new(vec![
        embed_page(&[(1, 1)]),
        embed_page(&[(2, 2)]),
        embed_page(&[(3, 3)]),
    ]);
    let config = test_config();
    let guard = ResourceGuard::new(
        &GuardConfig {
            memory_limit_mb: 64,
            sample_interval: 2,
        },
        Box::new(FixedProbe(512 * 1024 * 1024)),
    );

    let outcome = ScrollCrawler::new(&mut session, &config)
        .with_guard(guard)
        .run()
        .await
        .expect("first read succeeds");

    assert_eq!(outcome.stop_reason, StopReason::MemoryLimit);
    assert!(outcome.stop_reason.is_partial());
    assert_eq!(outcome.iterations, 2);
    assert_eq!(outcome.posts.len(), 2);
}

#[tokio::test]
async fn test_restricted_posts_are_kept() {
    let page = r#"<html><head><meta property="og:url" content="https://t.me/s/testchan"></head><body>
        <div class="tgme_channel_history">
          <div class="tgme_widget_message" data-post="testchan/9">
            <a class="tgme_widget_message_photo_wrap"></a>
            <div class="tgme_widget_message_error">Please open Telegram to view this post</div>
            <a class="tgme_widget_message_date" href="https://t.me/testchan/9"><time datetime="2024-01-09T10:00:00+00:00"></time></a>
          </div>
        </div></body></html>"#;
    let mut session = ScriptedSession::new(vec![page.to_string()]);
    let config = test_config();

    let outcome = ScrollCrawler::new(&mut session, &config)
        .run()
        .await
        .expect("first read succeeds");

    assert_eq!(outcome.restricted, 1);
    assert_eq!(outcome.posts.len(), 1);
    assert!(outcome.posts[0].is_restricted());
}

#[tokio::test]
async fn test_no_cap_collects_past_one_hundred() {
    let messages: Vec<(u32, u32)> = (1..=150).map(|id| (id, id % 28 + 1)).collect();
    let mut session = ScriptedSession::new(vec![embed_page(&messages)]);
    let request = ScrapeRequest::new("testchan");

    let result = scrape(&mut session, &test_config(), &request).await;

    assert_eq!(result.error, None);
    assert_eq!(result.posts.len(), 150);
    assert_eq!(result.total_posts, 150);
    assert_eq!(result.stop_reason, Some(StopReason::Stalled));
}

#[tokio::test]
async fn test_session_lost_keeps_posts_as_partial() {
    let mut session = ScriptedSession::new(vec![
        embed_page(&[(1, 1), (2, 2)]),
        embed_page(&[(3, 3)]),
    ]);
    session.lost_when_drained = true;
    let request = ScrapeRequest::new("testchan");

    let result = scrape(&mut session, &test_config(), &request).await;

    assert_eq!(result.stop_reason, Some(StopReason::SessionLost));
    assert!(result.partial);
    assert_eq!(result.error, None);
    assert_eq!(result.channel.username, "testchan");
    let ids: Vec<&str> = result.posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["testchan/3", "testchan/2", "testchan/1"]);
}

#[tokio::test]
async fn test_first_read_failure_is_reported_in_band() {
    let mut session = ScriptedSession::new(Vec::new());
    session.lost_when_drained = true;
    let request = ScrapeRequest::new("testchan");

    let result = scrape(&mut session, &test_config(), &request).await;

    assert!(result.error.is_some());
    assert!(!result.partial);
    assert!(result.posts.is_empty());
    assert_eq!(result.channel.username, UNKNOWN_HANDLE);
}

#[tokio::test]
async fn test_memory_stop_is_partial_without_error() {
    let mut session = ScriptedSession::new(vec![
        embed_page(&[(1, 1)]),
        embed_page(&[(2, 2)]),
        embed_page(&[(3, 3)]),
    ]);
    let guard = ResourceGuard::new(
        &GuardConfig {
            memory_limit_mb: 64,
            sample_interval: 2,
        },
        Box::new(FixedProbe(512 * 1024 * 1024)),
    );
    let request = ScrapeRequest::new("testchan");

    let result = scrape_with_guard(&mut session, &test_config(), &request, guard).await;

    assert_eq!(result.stop_reason, Some(StopReason::MemoryLimit));
    assert!(result.partial);
    assert_eq!(result.error, None);
    assert_eq!(result.total_posts, 2);
}
