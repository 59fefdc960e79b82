use serde::{Deserialize, Serialize};

/// Display name used when no page metadata yields a name
pub const UNKNOWN_CHANNEL_NAME: &str = "Unknown Channel";

/// Handle used when neither the page nor the target yields one
pub const UNKNOWN_HANDLE: &str = "unknown";

/// Channel-level metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub name: String,

    /// Channel handle without the leading `@`
    pub username: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriber_count: Option<u64>,

    #[serde(default)]
    pub verified: bool,

    /// Avatar image reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl Channel {
    /// The sentinel record returned when a crawl fails outright
    pub fn unknown() -> Self {
        Self {
            name: "Unknown".to_string(),
            username: UNKNOWN_HANDLE.to_string(),
            description: None,
            subscriber_count: None,
            verified: false,
            photo_url: None,
        }
    }

    /// Returns true if no handle was found for this channel
    pub fn has_unknown_handle(&self) -> bool {
        self.username == UNKNOWN_HANDLE
    }
}
