//! Push channel for change batches

use crate::document::DocumentChange;
use crate::error::{StoreError, StoreResult};
use tokio::sync::mpsc;

/// One delivery on a change stream. An `Err` item ends the stream.
pub type StreamItem = StoreResult<Vec<DocumentChange>>;

/// Receiving half of a live subscription.
///
/// Dropping the stream (or calling [`ChangeStream::close`]) detaches it from
/// the store.
#[derive(Debug)]
pub struct ChangeStream {
    rx: mpsc::UnboundedReceiver<StreamItem>,
}

impl ChangeStream {
    /// Create a connected sink/stream pair
    pub fn channel() -> (ChangeSink, ChangeStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChangeSink { tx }, ChangeStream { rx })
    }

    /// Wait for the next batch; `None` once the store side is gone
    pub async fn next_batch(&mut self) -> Option<StreamItem> {
        self.rx.recv().await
    }

    pub fn close(&mut self) {
        self.rx.close();
    }
}

/// Sending half, held by the store
#[derive(Debug, Clone)]
pub struct ChangeSink {
    tx: mpsc::UnboundedSender<StreamItem>,
}

impl ChangeSink {
    /// Deliver a batch. Returns false when the subscriber has detached.
    pub fn send_batch(&self, batch: Vec<DocumentChange>) -> bool {
        self.tx.send(Ok(batch)).is_ok()
    }

    /// Deliver a terminal error
    pub fn fail(&self, err: StoreError) -> bool {
        self.tx.send(Err(err)).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
