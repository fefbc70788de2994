//! Real-time feed synchronization for HobbyConnect
//!
//! Keeps a client-local, ordered cache of the newest posts consistent with a
//! one-shot snapshot load and a live stream of added/modified/removed
//! changes, and builds discovery and engagement on top of it.
//!
//! # Architecture
//!
//! ```text
//!               ┌──────────────── FeedEngine ────────────────┐
//!  store ──────▶│ ChangeSubscriber ──▶ Reconciler ──▶ watch  │──▶ readers
//!    │  fetch   │ SnapshotLoader ────▶ (seed)   OrderedCache │
//!    │          └────────────────────────────────────────────┘
//!    ◀── set add/remove, +1 ── EngagementAggregator
//!    ◀── create ────────────── PostComposer
//!    ◀── any-of query ──────── DiscoveryMatcher
//! ```
//!
//! The engine subscribes first and loads the snapshot second. Live events
//! always win over the snapshot for any identity they touch, which makes the
//! final cache independent of which side arrives first.
//!
//! [`Session`] scopes all of this to one signed-in user.

pub mod cache;
pub mod config;
pub mod decode;
pub mod discovery;
pub mod engagement;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod posts;
pub mod profile;
pub mod session;
pub mod snapshot;
pub mod subscriber;
pub mod telemetry;
pub mod timeout;

pub use cache::{CacheEntry, OrderedCache, SortKey};
pub use config::SyncConfig;
pub use discovery::{DiscoveryMatcher, MatchOutcome, RankedUser, TagFilter, TagPreview};
pub use engagement::{EngagementAggregator, LikeAction};
pub use engine::{
    ApplyOutcome, CacheSnapshot, FeedEngine, FeedSnapshot, FeedStatus, FeedView, Reconciler,
    SeedSummary,
};
pub use error::{SyncError, SyncResult};
pub use metrics::SyncMetrics;
pub use posts::PostComposer;
pub use profile::{ProfileService, ProfileStats};
pub use session::Session;
pub use snapshot::SnapshotLoader;
pub use subscriber::{ChangeSubscriber, Subscription};
