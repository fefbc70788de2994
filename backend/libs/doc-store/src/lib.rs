//! Document store interface for the HobbyConnect client
//!
//! The feed engine never talks to a backend directly; it goes through the
//! [`DocumentStore`] trait defined here.
//!
//! # Architecture
//!
//! ```text
//! feed-sync                         doc-store
//!   SnapshotLoader  ── fetch ──────▶ DocumentStore ──▶ backend
//!   ChangeSubscriber ── subscribe ─▶   │
//!                    ◀── ChangeStream ─┘  (one batch per committed write)
//!   EngagementAggregator ── mutate_set_field / mutate_counter / commit
//! ```
//!
//! Like-sets and comment counters are only ever changed through commutative
//! operations (set add/remove, counter increment), never by overwriting the
//! whole field, so concurrent writers cannot clobber each other.
//!
//! [`MemoryStore`] is a complete in-process implementation used by tests and
//! the demo binary. It supports fault injection (outages, read latency,
//! terminating change streams).

mod document;
mod error;
mod memory;
mod query;
mod store;
mod stream;

pub use document::{ChangeType, Document, DocumentChange, Fields, NewDocument};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use query::{Direction, Filter, OrderBy, Query, MAX_ANY_OF_VALUES};
pub use store::{DocumentStore, SetOp, Write};
pub use stream::{ChangeSink, ChangeStream, StreamItem};
