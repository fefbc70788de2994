//! Change stream subscriber
//!
//! Attaches to a store change stream on a background task and hands decoded
//! batches to a callback.
//!
//! ## Delivery guarantees
//!
//! - Batches reach `on_batch` in delivery order, one at a time.
//! - `on_error` fires at most once and ends the subscription; there is no
//!   automatic resubscription.
//! - Once [`Subscription::unsubscribe`] returns, neither callback fires
//!   again. Callbacks run while holding the subscription's gate, so they must
//!   not call back into their own subscription.

use crate::decode::decode_batch;
use crate::error::{SyncError, SyncResult};
use crate::metrics::SyncMetrics;
use doc_store::{DocumentStore, Query};
use feed_schema::{ChangeEvent, Entity};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Handle to a live subscription; dropping it unsubscribes
#[derive(Debug)]
pub struct Subscription {
    collection: String,
    active: Arc<Mutex<bool>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Whether callbacks may still fire
    pub fn is_active(&self) -> bool {
        *self.active.lock()
    }

    /// Detach from the stream. Idempotent.
    pub fn unsubscribe(&mut self) {
        // Waits for an in-flight callback to finish
        let was_active = std::mem::replace(&mut *self.active.lock(), false);

        if let Some(task) = self.task.take() {
            task.abort();
            if was_active {
                info!(collection = %self.collection, "Unsubscribed from change stream");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Opens typed change subscriptions against the store
#[derive(Clone)]
pub struct ChangeSubscriber {
    store: Arc<dyn DocumentStore>,
    metrics: SyncMetrics,
}

impl ChangeSubscriber {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            metrics: SyncMetrics::new(),
        }
    }

    /// Subscribe to `query`, decoding each batch into typed events.
    ///
    /// Malformed documents are dropped from their batch with a warning. A
    /// stream error, or the stream ending, is reported once through
    /// `on_error`.
    pub async fn subscribe<T, B, E>(
        &self,
        query: &Query,
        mut on_batch: B,
        on_error: E,
    ) -> SyncResult<Subscription>
    where
        T: Entity,
        B: FnMut(Vec<ChangeEvent<T>>) + Send + 'static,
        E: FnOnce(SyncError) + Send + 'static,
    {
        let mut stream = self.store.subscribe(query).await?;
        let active = Arc::new(Mutex::new(true));
        let gate = Arc::clone(&active);
        let collection = query.collection.clone();
        let task_collection = collection.clone();
        let metrics = self.metrics;

        let task = tokio::spawn(async move {
            let mut on_error = Some(on_error);

            loop {
                let item = stream.next_batch().await;

                let mut open = gate.lock();
                if !*open {
                    debug!(collection = %task_collection, "Dropping delivery after unsubscribe");
                    break;
                }

                let failure = match item {
                    Some(Ok(changes)) => {
                        let events = decode_batch::<T>(&changes);
                        debug!(
                            collection = %task_collection,
                            delivered = changes.len(),
                            decoded = events.len(),
                            "Change batch received"
                        );
                        on_batch(events);
                        continue;
                    }
                    Some(Err(err)) => SyncError::from(err),
                    None => SyncError::StoreUnavailable("change stream closed".to_string()),
                };

                *open = false;
                error!(collection = %task_collection, error = %failure, "Change stream terminated");
                metrics.record_termination("error");
                if let Some(on_error) = on_error.take() {
                    on_error(failure);
                }
                break;
            }
        });

        info!(collection = %collection, "Subscribed to change stream");
        Ok(Subscription {
            collection,
            active,
            task: Some(task),
        })
    }
}
