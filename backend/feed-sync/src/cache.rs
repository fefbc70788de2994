//! Ordered, identity-unique, capped entity cache
//!
//! Entries are kept in display order: newest insertion timestamp first.
//! Entries still waiting for a store-assigned timestamp sort ahead of every
//! stamped entry. Identity breaks timestamp ties so the final order never
//! depends on arrival order.

use chrono::{DateTime, Utc};
use feed_schema::Post;
use std::cmp::Ordering;

/// Anything the cache can hold
pub trait CacheEntry: Clone {
    fn key(&self) -> &str;
    fn timestamp(&self) -> Option<DateTime<Utc>>;

    fn sort_key(&self) -> SortKey<'_> {
        SortKey {
            timestamp: self.timestamp(),
            id: self.key(),
        }
    }
}

impl CacheEntry for Post {
    fn key(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

/// Position of an entry in display order; `Less` means shown first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey<'a> {
    pub timestamp: Option<DateTime<Utc>>,
    pub id: &'a str,
}

impl Ord for SortKey<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_time = match (self.timestamp, other.timestamp) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => b.cmp(&a),
        };
        by_time.then_with(|| other.id.cmp(self.id))
    }
}

impl PartialOrd for SortKey<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone)]
pub struct OrderedCache<T> {
    entries: Vec<T>,
    cap: usize,
}

impl<T: CacheEntry> OrderedCache<T> {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: Vec::with_capacity(cap.min(1024)),
            cap,
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.entries.clone()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.key() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.entries.iter().find(|entry| entry.key() == id)
    }

    fn slot_for(&self, entity: &T) -> usize {
        let key = entity.sort_key();
        self.entries.partition_point(|entry| entry.sort_key() < key)
    }

    /// Insert at the position implied by the sort key.
    ///
    /// Returns false, leaving the cache untouched, when the identity is
    /// already present.
    pub fn insert(&mut self, entity: T) -> bool {
        if self.contains(entity.key()) {
            return false;
        }
        let slot = self.slot_for(&entity);
        self.entries.insert(slot, entity);
        true
    }

    /// Replace an entry's fields, moving it only if its sort key changed.
    ///
    /// Returns false when the identity is absent.
    pub fn replace(&mut self, entity: T) -> bool {
        let Some(index) = self.position(entity.key()) else {
            return false;
        };

        if self.entries[index].timestamp() == entity.timestamp() {
            self.entries[index] = entity;
        } else {
            self.entries.remove(index);
            let slot = self.slot_for(&entity);
            self.entries.insert(slot, entity);
        }
        true
    }

    pub fn remove(&mut self, id: &str) -> Option<T> {
        let index = self.position(id)?;
        Some(self.entries.remove(index))
    }

    /// Drop the oldest entries beyond the cap, returning them oldest last
    pub fn evict_overflow(&mut self) -> Vec<T> {
        if self.entries.len() <= self.cap {
            return Vec::new();
        }
        self.entries.split_off(self.cap)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn post(id: &str, minute: Option<u32>) -> Post {
        let mut post: Post = serde_json::from_value(serde_json::json!({})).unwrap();
        post.id = id.to_string();
        post.created_at = minute.map(|m| Utc.with_ymd_and_hms(2024, 1, 1, 12, m, 0).unwrap());
        post
    }

    fn ids(cache: &OrderedCache<Post>) -> Vec<&str> {
        cache.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_insert_orders_newest_first() {
        let mut cache = OrderedCache::new(10);
        cache.insert(post("a", Some(1)));
        cache.insert(post("c", Some(3)));
        cache.insert(post("b", Some(2)));
        assert_eq!(ids(&cache), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_duplicate_insert_is_rejected() {
        let mut cache = OrderedCache::new(10);
        assert!(cache.insert(post("a", Some(1))));
        assert!(!cache.insert(post("a", Some(5))));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a").unwrap().created_at, post("a", Some(1)).created_at);
    }

    #[test]
    fn test_pending_timestamp_sorts_first() {
        let mut cache = OrderedCache::new(10);
        cache.insert(post("a", Some(59)));
        cache.insert(post("pending", None));
        assert_eq!(ids(&cache), vec!["pending", "a"]);
    }

    #[test]
    fn test_ties_break_on_identity() {
        let mut forward = OrderedCache::new(10);
        forward.insert(post("x", Some(1)));
        forward.insert(post("y", Some(1)));

        let mut backward = OrderedCache::new(10);
        backward.insert(post("y", Some(1)));
        backward.insert(post("x", Some(1)));

        assert_eq!(ids(&forward), ids(&backward));
    }

    #[test]
    fn test_replace_keeps_position_or_moves_on_new_timestamp() {
        let mut cache = OrderedCache::new(10);
        cache.insert(post("a", Some(1)));
        cache.insert(post("b", Some(2)));
        cache.insert(post("c", Some(3)));

        let mut edited = post("b", Some(2));
        edited.content = Some("edited".into());
        assert!(cache.replace(edited));
        assert_eq!(ids(&cache), vec!["c", "b", "a"]);
        assert_eq!(cache.get("b").unwrap().body(), "edited");

        // A pending post getting its server timestamp moves into place
        cache.insert(post("d", None));
        assert_eq!(ids(&cache), vec!["d", "c", "b", "a"]);
        assert!(cache.replace(post("d", Some(0))));
        assert_eq!(ids(&cache), vec!["c", "b", "a", "d"]);

        assert!(!cache.replace(post("missing", Some(1))));
    }

    #[test]
    fn test_evict_overflow_removes_oldest() {
        let mut cache = OrderedCache::new(2);
        cache.insert(post("a", Some(1)));
        cache.insert(post("b", Some(2)));
        cache.insert(post("c", Some(3)));

        let evicted = cache.evict_overflow();
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].id, "a");
        assert_eq!(ids(&cache), vec!["c", "b"]);
        assert!(cache.evict_overflow().is_empty());
    }

    #[test]
    fn test_remove() {
        let mut cache = OrderedCache::new(10);
        cache.insert(post("a", Some(1)));
        assert!(cache.remove("a").is_some());
        assert!(cache.remove("a").is_none());
        assert!(cache.is_empty());
    }
}
