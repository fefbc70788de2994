//! Property-based tests for the reconciliation core.
//!
//! Random event sequences over a small identity pool, so duplicates,
//! out-of-order removals and modify-before-add all show up often.

use chrono::{TimeZone, Utc};
use feed_schema::{ChangeEvent, ChangeKind, Post};
use feed_sync::{CacheEntry, OrderedCache, Reconciler};
use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Post `p{index}` with a timestamp derived from its index.
fn post(index: u8, revision: u8) -> Post {
    let mut post: Post = serde_json::from_value(serde_json::json!({})).unwrap();
    post.id = format!("p{}", index);
    post.content = Some(format!("rev {}", revision));
    // Several ids share a timestamp so identity tie-breaks are exercised
    post.created_at = Some(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, u32::from(index / 2))
            .unwrap(),
    );
    post
}

fn event_strategy(ids: u8) -> impl Strategy<Value = ChangeEvent<Post>> {
    (0..ids, 0u8..3, any::<u8>()).prop_map(|(index, kind, revision)| {
        let entity = post(index, revision);
        match kind {
            0 => ChangeEvent::added(entity),
            1 => ChangeEvent::modified(entity),
            _ => ChangeEvent::removed(entity),
        }
    })
}

/// Distinct-identity snapshot page
fn snapshot_strategy(ids: u8) -> impl Strategy<Value = Vec<Post>> {
    prop::collection::vec((0..ids, any::<u8>()), 0..ids as usize).prop_map(|pairs| {
        let entries: BTreeMap<u8, u8> = pairs.into_iter().collect();
        entries
            .into_iter()
            .map(|(index, revision)| post(index, revision))
            .collect()
    })
}

fn is_display_ordered(posts: &[Post]) -> bool {
    posts
        .windows(2)
        .all(|pair| pair[0].sort_key() < pair[1].sort_key())
}

proptest! {
    /// Property: the cache holds exactly the identities whose last event was
    /// not a removal, once each, in display order.
    #[test]
    fn cache_matches_last_event_per_identity(
        events in prop::collection::vec(event_strategy(8), 0..60)
    ) {
        let mut last_kind: HashMap<String, ChangeKind> = HashMap::new();
        for event in &events {
            last_kind.insert(event.entity.id.clone(), event.kind);
        }
        let expected: HashSet<String> = last_kind
            .into_iter()
            .filter(|(_, kind)| *kind != ChangeKind::Removed)
            .map(|(id, _)| id)
            .collect();

        let mut reconciler = Reconciler::new(1000);
        reconciler.apply_batch(events);

        let cached: Vec<String> = reconciler.cache().iter().map(|p| p.id.clone()).collect();
        let unique: HashSet<String> = cached.iter().cloned().collect();
        prop_assert_eq!(unique.len(), cached.len());
        prop_assert_eq!(unique, expected);
        prop_assert!(is_display_ordered(reconciler.cache().entries()));
    }

    /// Property: a repeated `added` leaves the cache as a single one did.
    #[test]
    fn duplicate_added_is_idempotent(
        events in prop::collection::vec(event_strategy(6), 0..30),
        index in 0u8..6,
        revision in any::<u8>(),
    ) {
        let mut once = Reconciler::new(1000);
        once.apply_batch(events.clone());
        once.apply(ChangeEvent::added(post(index, revision)));

        let mut twice = Reconciler::new(1000);
        twice.apply_batch(events);
        twice.apply(ChangeEvent::added(post(index, revision)));
        twice.apply(ChangeEvent::added(post(index, revision)));

        prop_assert_eq!(once.cache().entries(), twice.cache().entries());
    }

    /// Property: snapshot-then-live and live-then-snapshot converge.
    #[test]
    fn seed_and_live_events_commute(
        snapshot in snapshot_strategy(10),
        events in prop::collection::vec(event_strategy(10), 0..40),
    ) {
        let mut snapshot_first = Reconciler::new(1000);
        snapshot_first.seed(snapshot.clone());
        snapshot_first.apply_batch(events.clone());

        let mut live_first = Reconciler::new(1000);
        live_first.apply_batch(events);
        live_first.seed(snapshot);

        prop_assert_eq!(snapshot_first.cache().entries(), live_first.cache().entries());
    }

    /// Property: the cap holds after every single event.
    #[test]
    fn cap_is_never_exceeded(
        events in prop::collection::vec(event_strategy(20), 0..80),
        cap in 1usize..8,
    ) {
        let mut reconciler = Reconciler::new(cap);
        for event in events {
            reconciler.apply(event);
            prop_assert!(reconciler.cache().len() <= cap);
            prop_assert!(is_display_ordered(reconciler.cache().entries()));
        }
    }

    /// Property: eviction only ever drops entries older than every survivor.
    #[test]
    fn eviction_drops_oldest_first(
        indices in prop::collection::vec(0u8..40, 0..40),
        cap in 1usize..10,
    ) {
        let mut cache = OrderedCache::new(cap);
        for index in indices {
            cache.insert(post(index, 0));
        }
        let evicted = cache.evict_overflow();

        prop_assert!(cache.len() <= cap);
        for gone in &evicted {
            for kept in cache.iter() {
                prop_assert!(kept.sort_key() < gone.sort_key());
            }
        }
    }
}
