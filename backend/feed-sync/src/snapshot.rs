//! One-shot bulk loads
//!
//! A snapshot is a read of the same window the change subscription watches,
//! so its result can seed the cache without a second source of truth.

use crate::cache::CacheEntry;
use crate::decode::{decode, decode_all};
use crate::error::{SyncError, SyncResult};
use crate::metrics::SyncMetrics;
use crate::timeout::with_deadline;
use doc_store::{Direction, DocumentStore, Query};
use feed_schema::{Entity, Post, User, POSTS_COLLECTION, USERS_COLLECTION};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Field the store stamps on every post at insertion
pub const CREATED_AT_FIELD: &str = "createdAt";

/// The feed window: newest posts first, bounded by `page_size`
pub fn feed_query(page_size: usize) -> Query {
    Query::collection(POSTS_COLLECTION)
        .order_by(CREATED_AT_FIELD, Direction::Descending)
        .limit(page_size)
}

#[derive(Clone)]
pub struct SnapshotLoader {
    store: Arc<dyn DocumentStore>,
    metrics: SyncMetrics,
}

impl SnapshotLoader {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            metrics: SyncMetrics::new(),
        }
    }

    /// Fetch `query` and return its entities in display order.
    ///
    /// The result has no duplicate identities and never exceeds the query
    /// limit, whatever the store returned.
    pub async fn load<T>(&self, query: &Query, deadline: Option<Duration>) -> SyncResult<Vec<T>>
    where
        T: Entity + CacheEntry,
    {
        let fetched = with_deadline(deadline, async {
            self.store.fetch(query).await.map_err(SyncError::from)
        })
        .await;

        let docs = match fetched {
            Ok(docs) => docs,
            Err(err) => {
                let result = if err.is_retryable() {
                    "unavailable"
                } else {
                    "error"
                };
                self.metrics.record_snapshot_load(result);
                warn!(collection = %query.collection, error = %err, "Snapshot load failed");
                return Err(err);
            }
        };

        let mut entities: Vec<T> = decode_all(&docs);
        entities.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let mut seen = HashSet::with_capacity(entities.len());
        entities.retain(|entity| seen.insert(entity.key().to_string()));

        if let Some(limit) = query.limit {
            entities.truncate(limit);
        }

        self.metrics.record_snapshot_load("ok");
        debug!(
            collection = %query.collection,
            fetched = docs.len(),
            loaded = entities.len(),
            "Snapshot loaded"
        );
        Ok(entities)
    }

    pub async fn load_feed(
        &self,
        page_size: usize,
        deadline: Option<Duration>,
    ) -> SyncResult<Vec<Post>> {
        self.load(&feed_query(page_size), deadline).await
    }

    /// Load one entity; `NotFound` is reported as such
    pub async fn load_one<T: Entity>(
        &self,
        collection: &str,
        id: &str,
        deadline: Option<Duration>,
    ) -> SyncResult<T> {
        let doc = with_deadline(deadline, async {
            self.store.get(collection, id).await.map_err(SyncError::from)
        })
        .await?;
        decode(&doc)
    }

    pub async fn load_user(&self, uid: &str, deadline: Duration) -> SyncResult<User> {
        self.load_one(USERS_COLLECTION, uid, Some(deadline)).await
    }
}
