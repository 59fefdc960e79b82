//! Per-crawl record store keyed by post identifier

use crate::records::Post;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Accumulates records across iterations; the first record seen for an
/// identifier is kept and later ones are ignored
#[derive(Debug, Default)]
pub struct DeduplicationStore {
    posts: HashMap<String, Post>,
    restricted: usize,
}

impl DeduplicationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record unless its identifier is already present
    ///
    /// # Returns
    ///
    /// `true` if the record was new
    pub fn insert(&mut self, post: Post) -> bool {
        if self.posts.contains_key(&post.id) {
            return false;
        }
        if post.is_restricted() {
            self.restricted += 1;
        }
        self.posts.insert(post.id.clone(), post);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.posts.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Number of stored records whose content is the restricted sentinel
    pub fn restricted_count(&self) -> usize {
        self.restricted
    }

    /// Consumes the store, returning records newest first
    ///
    /// Records with equal dates are ordered by identifier, descending, so the
    /// output is deterministic.
    pub fn into_sorted(self) -> Vec<Post> {
        let mut posts: Vec<Post> = self.posts.into_values().collect();
        posts.sort_by(newest_first);
        posts
    }
}

fn newest_first(a: &Post, b: &Post) -> Ordering {
    b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn post(id: &str, day: u32, content: &str) -> Post {
        Post {
            id: id.to_string(),
            synthetic_id: false,
            date: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            content: content.to_string(),
            views: 0,
            reactions: Vec::new(),
            has_media: false,
            media_types: Vec::new(),
            channel_name: "c".to_string(),
        }
    }

    #[test]
    fn test_first_seen_wins() {
        let mut store = DeduplicationStore::new();
        assert!(store.insert(post("a", 1, "original")));
        assert!(!store.insert(post("a", 2, "edited")));
        assert_eq!(store.len(), 1);

        let posts = store.into_sorted();
        assert_eq!(posts[0].content, "original");
        assert_eq!(posts[0].date, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_sorted_newest_first_with_id_tiebreak() {
        let mut store = DeduplicationStore::new();
        store.insert(post("a", 1, "x"));
        store.insert(post("c", 3, "x"));
        store.insert(post("b", 3, "x"));
        store.insert(post("d", 2, "x"));

        let ids: Vec<String> = store.into_sorted().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["c", "b", "d", "a"]);
    }

    #[test]
    fn test_restricted_counted_once() {
        let mut store = DeduplicationStore::new();
        let restricted = "[Restricted content: Please open Telegram to view this post]";
        store.insert(post("r", 1, restricted));
        store.insert(post("r", 1, restricted));
        store.insert(post("ok", 1, "fine"));
        assert_eq!(store.restricted_count(), 1);
        assert!(store.contains("r"));
        assert!(!store.is_empty());
    }
}
