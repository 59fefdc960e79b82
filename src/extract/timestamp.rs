//! Best-effort timestamp parsing
//!
//! Accepted forms, tried in order:
//!
//! - RFC 3339 (`2024-01-05T10:00:00+00:00`), the embed's `datetime` attribute
//! - `YYYY-MM-DD HH:MM[:SS]` and `YYYY-MM-DDTHH:MM[:SS]`
//! - `DD.MM.YYYY, HH:MM[:SS]` and `DD.MM.YYYY HH:MM[:SS]`
//! - `Month D, YYYY at H:MM` (optionally with `AM`/`PM`)
//! - `D Month YYYY, HH:MM[:SS]`
//!
//! Forms without an offset are read as UTC. Every function here is total.

use chrono::{DateTime, NaiveDateTime, Utc};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%d.%m.%Y, %H:%M:%S",
    "%d.%m.%Y, %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%B %d, %Y at %I:%M %p",
    "%B %d, %Y at %H:%M",
    "%d %B %Y, %H:%M:%S",
    "%d %B %Y, %H:%M",
];

/// Parses a human- or machine-readable timestamp
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

/// Parses a unix timestamp in seconds (the application's `data-timestamp`)
pub fn parse_unix_seconds(text: &str) -> Option<DateTime<Utc>> {
    let seconds = text.trim().parse::<i64>().ok()?;
    if seconds <= 0 {
        return None;
    }
    DateTime::from_timestamp(seconds, 0)
}
