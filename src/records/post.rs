/// Post record definitions
///
/// A `Post` is the stable output schema regardless of which rendering of the
/// feed produced it.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of media a post can carry
///
/// Declaration order is the canonical order used when listing kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Photo,
    Video,
    Audio,
    Document,
    Poll,
    Location,
}

impl MediaType {
    /// Returns the lowercase label used in sentinels and serialized output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Document => "document",
            Self::Poll => "poll",
            Self::Location => "location",
        }
    }

    /// Joins kinds as `"photo, video"`
    pub fn join(kinds: &[MediaType]) -> String {
        kinds
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single reaction on a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    /// The reaction symbol (usually an emoji)
    pub emoji: String,

    /// Number of users who reacted, always > 0
    pub count: u64,
}

/// A post extracted from a channel feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Identifier, stable across passes unless `synthetic_id` is set
    pub id: String,

    /// True when the source carried no identifier and one was generated
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub synthetic_id: bool,

    /// Publication time (extraction time when the page omitted it)
    pub date: DateTime<Utc>,

    /// Body text, or a bracketed sentinel when unavailable
    pub content: String,

    pub views: u64,

    #[serde(default)]
    pub reactions: Vec<Reaction>,

    pub has_media: bool,

    #[serde(default)]
    pub media_types: Vec<MediaType>,

    /// Label of the channel the post originated from
    pub channel_name: String,
}

impl Post {
    /// Returns true if the body is the restricted-content sentinel
    pub fn is_restricted(&self) -> bool {
        self.content.starts_with("[Restricted content:")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_post(content: &str) -> Post {
        Post {
            id: "chan/1".to_string(),
            synthetic_id: false,
            date: Utc::now(),
            content: content.to_string(),
            views: 10,
            reactions: vec![
                Reaction {
                    emoji: "🔥".to_string(),
                    count: 3,
                },
                Reaction {
                    emoji: "👍".to_string(),
                    count: 4,
                },
            ],
            has_media: false,
            media_types: vec![],
            channel_name: "Chan".to_string(),
        }
    }

    #[test]
    fn test_media_type_canonical_order() {
        let mut kinds = vec![MediaType::Poll, MediaType::Photo, MediaType::Audio];
        kinds.sort();
        assert_eq!(kinds, vec![MediaType::Photo, MediaType::Audio, MediaType::Poll]);
    }

    #[test]
    fn test_media_type_join() {
        assert_eq!(
            MediaType::join(&[MediaType::Photo, MediaType::Video]),
            "photo, video"
        );
        assert_eq!(MediaType::join(&[]), "");
    }

    #[test]
    fn test_is_restricted() {
        assert!(sample_post("[Restricted content: photo - Please open Telegram to view]")
            .is_restricted());
        assert!(!sample_post("hello").is_restricted());
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(sample_post("x")).unwrap();
        assert!(json.get("hasMedia").is_some());
        assert!(json.get("channelName").is_some());
        assert!(json.get("syntheticId").is_none());
    }
}
