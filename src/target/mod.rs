//! Crawl target handling for Telescroll
//!
//! This module turns whatever the caller typed (a bare handle, `@handle`, or
//! a `t.me` link) into a validated channel handle, and builds the URLs the
//! navigator tries for that handle.

mod resolve;

pub use resolve::resolve_target;

use std::fmt;

/// Hosts that serve channel pages
pub const CHANNEL_HOSTS: &[&str] = &["t.me", "telegram.me"];

/// Web application clients, in the order they are tried
pub const APP_CLIENTS: &[&str] = &["a", "z", "k"];

const PUBLIC_BASE: &str = "https://t.me";
const APP_BASE: &str = "https://web.telegram.org";

/// Ways the public site can serve a channel feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublicFormat {
    /// `t.me/s/<handle>`: the scrollable feed
    Embedded,
    /// `t.me/<handle>?embed=1`
    Widget,
    /// `t.me/<handle>?preview=1`
    Preview,
}

impl PublicFormat {
    /// All formats, in the order they are tried
    pub fn all() -> [PublicFormat; 3] {
        [Self::Embedded, Self::Widget, Self::Preview]
    }
}

impl fmt::Display for PublicFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Embedded => write!(f, "embedded"),
            Self::Widget => write!(f, "widget"),
            Self::Preview => write!(f, "preview"),
        }
    }
}

/// A validated channel handle
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelTarget {
    handle: String,
}

impl ChannelTarget {
    pub(crate) fn new(handle: String) -> Self {
        Self { handle }
    }

    /// The handle without a leading `@`
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// Public URL for the given feed format
    pub fn public_url(&self, format: PublicFormat) -> String {
        match format {
            PublicFormat::Embedded => format!("{}/s/{}", PUBLIC_BASE, self.handle),
            PublicFormat::Widget => format!("{}/{}?embed=1", PUBLIC_BASE, self.handle),
            PublicFormat::Preview => format!("{}/{}?preview=1", PUBLIC_BASE, self.handle),
        }
    }

    /// Public URLs in the order they are tried
    pub fn public_candidates(&self) -> Vec<(PublicFormat, String)> {
        PublicFormat::all()
            .into_iter()
            .map(|format| (format, self.public_url(format)))
            .collect()
    }

    /// Landing page of a web application client
    pub fn app_client_url(client: &str) -> String {
        format!("{}/{}/", APP_BASE, client)
    }

    /// The channel inside the web application
    pub fn app_channel_url(&self) -> String {
        format!("{}/a/#@{}", APP_BASE, self.handle)
    }
}

impl fmt::Display for ChannelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.handle)
    }
}
