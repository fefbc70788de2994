//! Interest-based discovery
//!
//! Candidates come from one capped any-of query on the requester's tags.
//! Ranking is by the number of shared tags, descending; the sort is stable so
//! equal overlaps keep the order the store returned them in. Narrowing to a
//! single tag re-filters the last ranked set and never refetches.

use crate::config::DiscoveryConfig;
use crate::decode::decode_all;
use crate::error::SyncResult;
use doc_store::{DocumentStore, Query};
use feed_schema::{Hobby, TagSet, User, USERS_COLLECTION};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

const HOBBIES_FIELD: &str = "hobbies";

/// A candidate with the tags it shares with the requester
#[derive(Debug, Clone, PartialEq)]
pub struct RankedUser {
    pub user: User,
    /// Shared tags in enumeration order
    pub shared: Vec<Hobby>,
}

/// Leading shared tags plus how many were left out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPreview {
    pub shown: Vec<Hobby>,
    pub more: usize,
}

impl RankedUser {
    pub fn overlap(&self) -> usize {
        self.shared.len()
    }

    pub fn preview(&self, n: usize) -> TagPreview {
        TagPreview {
            shown: self.shared.iter().take(n).copied().collect(),
            more: self.shared.len().saturating_sub(n),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// The requester has no tags; nothing was matched
    NoTagsRequested,
    Ranked(Vec<RankedUser>),
}

impl MatchOutcome {
    pub fn users(&self) -> &[RankedUser] {
        match self {
            MatchOutcome::NoTagsRequested => &[],
            MatchOutcome::Ranked(users) => users,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFilter {
    All,
    Only(Hobby),
}

/// Rank `candidates` by overlap with `requester_tags`, excluding `exclude_id`.
///
/// Zero-overlap candidates are kept at the end.
pub fn rank(candidates: Vec<User>, requester_tags: &TagSet, exclude_id: &str) -> MatchOutcome {
    if requester_tags.is_empty() {
        return MatchOutcome::NoTagsRequested;
    }

    let mut ranked: Vec<RankedUser> = candidates
        .into_iter()
        .filter(|user| user.id != exclude_id)
        .map(|user| {
            let shared = user.shared_tags(requester_tags);
            RankedUser { user, shared }
        })
        .collect();

    // Stable: ties keep input order
    ranked.sort_by(|a, b| b.overlap().cmp(&a.overlap()));
    MatchOutcome::Ranked(ranked)
}

/// Exact-tag narrowing of an already ranked set
pub fn filter(ranked: &[RankedUser], tag_filter: TagFilter) -> Vec<RankedUser> {
    match tag_filter {
        TagFilter::All => ranked.to_vec(),
        TagFilter::Only(tag) => ranked
            .iter()
            .filter(|candidate| candidate.user.has_tag(tag))
            .cloned()
            .collect(),
    }
}

/// Tags sent to the store: the first `limit` in enumeration order
pub fn query_tags(tags: &TagSet, limit: usize) -> Vec<Hobby> {
    tags.iter().take(limit).copied().collect()
}

pub fn candidate_query(tags: &TagSet, config: &DiscoveryConfig) -> Query {
    let values = query_tags(tags, config.tag_limit)
        .into_iter()
        .map(|tag| Value::String(tag.name().to_string()))
        .collect();
    Query::collection(USERS_COLLECTION)
        .where_array_contains_any(HOBBIES_FIELD, values)
        .limit(config.result_limit)
}

/// Discovery state for one requester: the last full ranked set
pub struct DiscoveryMatcher {
    store: Arc<dyn DocumentStore>,
    config: DiscoveryConfig,
    requester_tags: TagSet,
    ranked: Vec<RankedUser>,
}

impl DiscoveryMatcher {
    pub fn new(store: Arc<dyn DocumentStore>, config: DiscoveryConfig) -> Self {
        Self {
            store,
            config,
            requester_tags: TagSet::new(),
            ranked: Vec::new(),
        }
    }

    /// Fetch candidates for `requester` and replace the ranked set.
    ///
    /// An empty tag set short-circuits before any store call.
    pub async fn refresh(&mut self, requester: &User) -> SyncResult<MatchOutcome> {
        self.requester_tags = requester.hobbies.clone();

        if requester.hobbies.is_empty() {
            self.ranked.clear();
            debug!(user_id = %requester.id, "No tags to match on");
            return Ok(MatchOutcome::NoTagsRequested);
        }

        let query = candidate_query(&requester.hobbies, &self.config);
        let docs = self.store.fetch(&query).await?;
        let candidates: Vec<User> = decode_all(&docs);

        let outcome = rank(candidates, &requester.hobbies, &requester.id);
        self.ranked = outcome.users().to_vec();

        info!(
            user_id = %requester.id,
            candidates = docs.len(),
            ranked = self.ranked.len(),
            "Discovery refreshed"
        );
        Ok(outcome)
    }

    /// Last full ranked set
    pub fn results(&self) -> &[RankedUser] {
        &self.ranked
    }

    /// Narrow the last ranked set without refetching
    pub fn filter(&self, tag_filter: TagFilter) -> Vec<RankedUser> {
        filter(&self.ranked, tag_filter)
    }

    /// "All" followed by each of the requester's tags
    pub fn filter_options(&self) -> Vec<TagFilter> {
        std::iter::once(TagFilter::All)
            .chain(self.requester_tags.iter().copied().map(TagFilter::Only))
            .collect()
    }
}
