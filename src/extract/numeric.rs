//! Abbreviated count parsing
//!
//! Counters on the feed are rendered as short, locale-flavoured text such as
//! `"1.2K"`, `"3M"`, `"950 views"` or `"12.4K subscribers"`.
//!
//! # Grammar
//!
//! 1. Drop every character except ASCII digits, `.`, `K` and `M`.
//! 2. If a `K` or `M` remains, the first one found is the suffix: the rest is
//!    parsed as a decimal and multiplied by 1 000 or 1 000 000, rounded to
//!    the nearest integer.
//! 3. Otherwise the digits before the first `.` are parsed as an integer.
//! 4. Anything that fails to parse yields 0.

use regex::Regex;
use std::sync::LazyLock;

static SUBSCRIBERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d\s,]*(?:\.\d+)?)\s*([KM])?\s*(?:subscribers?|members?|участник)")
        .expect("hardcoded regex pattern is valid")
});

/// Parses abbreviated count text into an integer. Never fails.
///
/// # Examples
///
/// ```
/// use telescroll::extract::parse_count;
///
/// assert_eq!(parse_count("1.2K"), 1200);
/// assert_eq!(parse_count("3M"), 3_000_000);
/// assert_eq!(parse_count("900"), 900);
/// assert_eq!(parse_count("abc"), 0);
/// ```
pub fn parse_count(text: &str) -> u64 {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | 'K' | 'M'))
        .collect();

    let suffix = cleaned.chars().find(|c| matches!(c, 'K' | 'M'));
    let number: String = cleaned.chars().filter(|c| !matches!(c, 'K' | 'M')).collect();

    match suffix {
        Some(letter) => {
            let multiplier = if letter == 'M' { 1_000_000.0 } else { 1_000.0 };
            match number.parse::<f64>() {
                Ok(value) if value.is_finite() && value >= 0.0 => {
                    let scaled = (value * multiplier).round();
                    if scaled >= u64::MAX as f64 {
                        0
                    } else {
                        scaled as u64
                    }
                }
                _ => 0,
            }
        }
        None => {
            let integral = number.split('.').next().unwrap_or_default();
            integral.parse::<u64>().unwrap_or(0)
        }
    }
}

/// Finds a `"<count> subscribers"`-style phrase and parses its count
///
/// Returns `None` when the text carries no such phrase.
pub fn parse_subscriber_count(text: &str) -> Option<u64> {
    let caps = SUBSCRIBERS_RE.captures(text)?;
    let mut count_text = caps.get(1)?.as_str().to_string();
    if let Some(suffix) = caps.get(2) {
        count_text.push_str(&suffix.as_str().to_uppercase());
    }
    Some(parse_count(&count_text))
}
