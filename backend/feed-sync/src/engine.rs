//! Reconciliation engine
//!
//! Merges a one-shot snapshot load and an unbounded stream of change events
//! into a single ordered cache.
//!
//! ## Per-identity state machine
//!
//! ```text
//!              added / modified
//!   Absent ───────────────────────▶ Present ──┐ modified: replace in place
//!     ▲                                │  ▲   │ added: no-op (duplicate)
//!     └──────────── removed ───────────┘  └───┘
//!   removed while Absent: no-op
//! ```
//!
//! ## Snapshot vs. live race
//!
//! Every identity touched by a live event is remembered. Seeding from the
//! snapshot only inserts identities no live event has touched, so a slow
//! snapshot can neither resurrect a removed post nor roll back a newer copy.
//! The converse also holds: the first live `added` for an identity that was
//! only seeded refreshes its fields, since the live copy is the fresher one.
//! Together these make the final cache independent of which side lands first.
//!
//! A snapshot seeds once per reset. After that the touched set only needs to
//! cover identities still cached, so it is pruned on seed, removal and
//! eviction and stays bounded by the cap.

use crate::cache::{CacheEntry, OrderedCache};
use crate::config::FeedConfig;
use crate::error::{SyncError, SyncResult};
use crate::metrics::SyncMetrics;
use crate::snapshot::{feed_query, SnapshotLoader};
use crate::subscriber::{ChangeSubscriber, Subscription};
use doc_store::DocumentStore;
use feed_schema::{ChangeEvent, ChangeKind, Post};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Result of applying one change event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Inserted,
    Replaced,
    Removed,
    /// Duplicate `added` or `removed` of an absent identity
    Ignored,
}

impl ApplyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyOutcome::Inserted => "inserted",
            ApplyOutcome::Replaced => "replaced",
            ApplyOutcome::Removed => "removed",
            ApplyOutcome::Ignored => "ignored",
        }
    }

    pub fn changed(&self) -> bool {
        !matches!(self, ApplyOutcome::Ignored)
    }
}

/// Counts from seeding a snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub seeded: usize,
    pub skipped: usize,
    pub evicted: usize,
}

/// Point-in-time copy of the cache handed to readers
#[derive(Debug, Clone)]
pub struct CacheSnapshot<T> {
    /// Bumped on every reconciled batch, seed and reset
    pub version: u64,
    pub entries: Arc<Vec<T>>,
}

impl<T> Default for CacheSnapshot<T> {
    fn default() -> Self {
        Self {
            version: 0,
            entries: Arc::new(Vec::new()),
        }
    }
}

pub type FeedSnapshot = CacheSnapshot<Post>;

/// Synchronous reconciliation core; owns the cache exclusively
#[derive(Debug)]
pub struct Reconciler<T> {
    cache: OrderedCache<T>,
    /// Identities touched by live events; only cached ones once seeded
    live: HashSet<String>,
    seeded: bool,
    version: u64,
    metrics: SyncMetrics,
}

impl<T: CacheEntry> Reconciler<T> {
    pub fn new(cap: usize) -> Self {
        Self {
            cache: OrderedCache::new(cap),
            live: HashSet::new(),
            seeded: false,
            version: 0,
            metrics: SyncMetrics::new(),
        }
    }

    pub fn cache(&self) -> &OrderedCache<T> {
        &self.cache
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Apply one event, then enforce the cap
    pub fn apply(&mut self, event: ChangeEvent<T>) -> ApplyOutcome {
        let ChangeEvent { kind, entity } = event;
        let first_live = self.live.insert(entity.key().to_string());

        let outcome = match kind {
            ChangeKind::Added => {
                if !self.cache.contains(entity.key()) {
                    self.cache.insert(entity);
                    ApplyOutcome::Inserted
                } else if first_live {
                    // Present only through the snapshot; the live copy wins
                    self.cache.replace(entity);
                    ApplyOutcome::Replaced
                } else {
                    ApplyOutcome::Ignored
                }
            }
            ChangeKind::Modified => {
                if self.cache.contains(entity.key()) {
                    self.cache.replace(entity);
                    ApplyOutcome::Replaced
                } else {
                    debug!(id = %entity.key(), "Modified before added; inserting");
                    self.cache.insert(entity);
                    ApplyOutcome::Inserted
                }
            }
            ChangeKind::Removed => {
                if self.seeded {
                    self.live.remove(entity.key());
                }
                match self.cache.remove(entity.key()) {
                    Some(_) => ApplyOutcome::Removed,
                    None => ApplyOutcome::Ignored,
                }
            }
        };

        self.metrics.record_event(kind.as_str(), outcome.as_str());
        self.evict();
        outcome
    }

    /// Apply a batch in delivery order; returns how many events changed the cache
    pub fn apply_batch(&mut self, events: Vec<ChangeEvent<T>>) -> usize {
        let changed = events
            .into_iter()
            .map(|event| self.apply(event))
            .filter(ApplyOutcome::changed)
            .count();
        self.version += 1;
        changed
    }

    /// Seed snapshot entities not already covered by live events.
    ///
    /// Expected once per reset; touched identities no longer cached are
    /// forgotten afterwards.
    pub fn seed(&mut self, entities: Vec<T>) -> SeedSummary {
        let mut summary = SeedSummary::default();
        for entity in entities {
            if self.live.contains(entity.key()) || !self.cache.insert(entity) {
                summary.skipped += 1;
            } else {
                summary.seeded += 1;
            }
        }
        summary.evicted = self.evict();
        let cache = &self.cache;
        self.live.retain(|id| cache.contains(id));
        self.seeded = true;
        self.version += 1;

        self.metrics.record_seed_skips(summary.skipped);
        summary
    }

    /// Discard all state; the next session starts empty
    pub fn reset(&mut self) {
        self.cache.clear();
        self.live.clear();
        self.seeded = false;
        self.version += 1;
    }

    pub fn snapshot(&self) -> CacheSnapshot<T> {
        CacheSnapshot {
            version: self.version,
            entries: Arc::new(self.cache.to_vec()),
        }
    }

    fn evict(&mut self) -> usize {
        let evicted = self.cache.evict_overflow();
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "Evicted entries past cache cap");
            self.metrics.record_evictions(evicted.len());
            if self.seeded {
                for entity in &evicted {
                    self.live.remove(entity.key());
                }
            }
        }
        evicted.len()
    }
}

/// Read access to cached posts
pub trait FeedView: Send + Sync {
    fn post(&self, id: &str) -> Option<Post>;
}

impl FeedView for OrderedCache<Post> {
    fn post(&self, id: &str) -> Option<Post> {
        self.get(id).cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedStatus {
    /// No subscription
    Idle,
    Live,
    /// Subscription ended with an error; the cache is last-known-good
    Failed(String),
}

struct FeedState {
    reconciler: Reconciler<Post>,
    status: FeedStatus,
    /// Bumped on every start so late snapshots from older starts are dropped
    generation: u64,
}

struct Shared {
    state: Mutex<FeedState>,
    updates: watch::Sender<FeedSnapshot>,
}

impl Shared {
    fn apply(&self, events: Vec<ChangeEvent<Post>>) {
        let snapshot = {
            let mut state = self.state.lock();
            let changed = state.reconciler.apply_batch(events);
            debug!(changed, size = state.reconciler.cache().len(), "Batch reconciled");
            state.reconciler.snapshot()
        };
        self.updates.send_replace(snapshot);
    }

    fn seed(&self, generation: u64, posts: Vec<Post>) {
        let snapshot = {
            let mut state = self.state.lock();
            if state.generation != generation {
                debug!(generation, "Dropping snapshot from a retired subscription");
                return;
            }
            let summary = state.reconciler.seed(posts);
            info!(
                seeded = summary.seeded,
                skipped = summary.skipped,
                evicted = summary.evicted,
                "Feed snapshot reconciled"
            );
            state.reconciler.snapshot()
        };
        self.updates.send_replace(snapshot);
    }

    fn fail(&self, err: SyncError) {
        let mut state = self.state.lock();
        warn!(error = %err, "Feed subscription failed; keeping last-known-good cache");
        state.status = FeedStatus::Failed(err.to_string());
    }

    /// Discard the cache and open a new generation
    fn reset(&self, status: FeedStatus) -> u64 {
        let (generation, snapshot) = {
            let mut state = self.state.lock();
            state.reconciler.reset();
            state.generation += 1;
            state.status = status;
            (state.generation, state.reconciler.snapshot())
        };
        self.updates.send_replace(snapshot);
        generation
    }
}

/// Live, ordered feed of the newest posts.
///
/// Owns the one change subscription for the feed window. `start` retires any
/// previous subscription before opening a new one, so deliveries from two
/// subscriptions can never interleave in the same cache.
pub struct FeedEngine {
    config: FeedConfig,
    loader: SnapshotLoader,
    subscriber: ChangeSubscriber,
    shared: Arc<Shared>,
    subscription: tokio::sync::Mutex<Option<Subscription>>,
}

impl FeedEngine {
    pub fn new(store: Arc<dyn DocumentStore>, config: FeedConfig) -> Self {
        let (updates, _) = watch::channel(FeedSnapshot::default());
        let state = FeedState {
            reconciler: Reconciler::new(config.cache_cap),
            status: FeedStatus::Idle,
            generation: 0,
        };

        Self {
            config,
            loader: SnapshotLoader::new(Arc::clone(&store)),
            subscriber: ChangeSubscriber::new(store),
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                updates,
            }),
            subscription: tokio::sync::Mutex::new(None),
        }
    }

    /// Subscribe to the feed window, then load and seed the snapshot.
    ///
    /// A failed snapshot load is returned to the caller but the subscription
    /// stays up and keeps filling the cache. Calling `start` again is how a
    /// collaborator resubscribes after a failure.
    pub async fn start(&self) -> SyncResult<()> {
        let generation = {
            let mut slot = self.subscription.lock().await;
            if let Some(mut prior) = slot.take() {
                prior.unsubscribe();
            }

            // Live before subscribing so an immediate error is not overwritten
            let generation = self.shared.reset(FeedStatus::Live);

            let query = feed_query(self.config.page_size);
            let on_batch = {
                let shared = Arc::clone(&self.shared);
                move |events| shared.apply(events)
            };
            let on_error = {
                let shared = Arc::clone(&self.shared);
                move |err| shared.fail(err)
            };

            match self
                .subscriber
                .subscribe::<Post, _, _>(&query, on_batch, on_error)
                .await
            {
                Ok(subscription) => *slot = Some(subscription),
                Err(err) => {
                    self.shared.state.lock().status = FeedStatus::Failed(err.to_string());
                    return Err(err);
                }
            }
            generation
        };

        match self
            .loader
            .load_feed(self.config.page_size, self.config.load_timeout)
            .await
        {
            Ok(posts) => {
                self.shared.seed(generation, posts);
                Ok(())
            }
            Err(err) => {
                // No snapshot is coming for this generation
                self.shared.seed(generation, Vec::new());
                Err(err)
            }
        }
    }

    /// Unsubscribe and discard the cache
    pub async fn stop(&self) {
        let mut slot = self.subscription.lock().await;
        if let Some(mut subscription) = slot.take() {
            subscription.unsubscribe();
        }
        self.shared.reset(FeedStatus::Idle);
        info!("Feed stopped");
    }

    pub fn status(&self) -> FeedStatus {
        self.shared.state.lock().status.clone()
    }

    pub fn is_live(&self) -> bool {
        self.status() == FeedStatus::Live
    }

    /// Current ordered feed
    pub fn snapshot(&self) -> FeedSnapshot {
        self.shared.updates.borrow().clone()
    }

    /// Receiver notified after every reconciled batch
    pub fn watch(&self) -> watch::Receiver<FeedSnapshot> {
        self.shared.updates.subscribe()
    }
}

impl FeedView for FeedEngine {
    fn post(&self, id: &str) -> Option<Post> {
        self.shared.state.lock().reconciler.cache().post(id)
    }
}
