//! Telescroll: an incremental channel-feed crawler
//!
//! This crate drives a browser session over an infinitely-scrolling channel
//! feed (the public `t.me/s/` embed or the logged-in web application),
//! extracts post records from whatever DOM shape the page currently has, and
//! accumulates a deduplicated, time-ordered record set.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod records;
pub mod session;
pub mod target;

use thiserror::Error;

/// Main error type for Telescroll operations
#[derive(Debug, Error)]
pub enum TelescrollError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session error: {0}")]
    Session(#[from] session::SessionError),

    #[error("Invalid target: {0}")]
    Target(#[from] TargetError),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Authenticated mode failed: {0}")]
    Authentication(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors raised while resolving a crawl target into a channel handle
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("Empty target")]
    Empty,

    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Not a Telegram URL (host {0})")]
    ForeignHost(String),

    #[error("No channel handle in {0}")]
    MissingHandle(String),

    #[error("Invalid channel handle: {0}")]
    InvalidHandle(String),
}

/// Result type alias for Telescroll operations
pub type Result<T> = std::result::Result<T, TelescrollError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for target resolution
pub type TargetResult<T> = std::result::Result<T, TargetError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{scrape, ScrapeRequest, ScrapeResult, ScrollCrawler, StopReason};
pub use extract::{extract_page, parse_count, ExtractedPage, Rendering};
pub use records::{Channel, MediaType, Post, Reaction};
pub use session::{BrowserSession, SessionError};
pub use target::{resolve_target, ChannelTarget};
