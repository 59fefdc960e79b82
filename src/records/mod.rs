//! Record schema shared by the extractor, the crawler and downstream consumers
//!
//! # Components
//!
//! - `Post`: one extracted feed entry, immutable once built
//! - `Reaction`: a `{emoji, count}` pair attached to a post
//! - `MediaType`: the kinds of media a post may carry
//! - `Channel`: channel-level metadata (name, handle, counters)

mod channel;
mod post;

// Re-export main types
pub use channel::{Channel, UNKNOWN_CHANNEL_NAME, UNKNOWN_HANDLE};
pub use post::{MediaType, Post, Reaction};
