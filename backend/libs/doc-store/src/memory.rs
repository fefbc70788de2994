//! In-process document store
//!
//! Keeps collections as JSON maps behind one lock and derives change batches
//! by diffing each subscription's query window before and after a commit:
//!
//! ```text
//! commit(writes) ──▶ apply to a copy ──▶ swap in ──▶ for each subscription:
//!                                                     old window vs new window
//!                                                     ├─ left the window  → Removed
//!                                                     ├─ entered          → Added
//!                                                     └─ fields changed   → Modified
//! ```
//!
//! Removals are reported first, then additions/modifications in window order.

use crate::document::{ChangeType, Document, DocumentChange, Fields, NewDocument};
use crate::error::{StoreError, StoreResult};
use crate::query::Query;
use crate::store::{DocumentStore, SetOp, Write};
use crate::stream::{ChangeSink, ChangeStream};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

type Collection = BTreeMap<String, Fields>;

struct Subscription {
    id: u64,
    query: Query,
    sink: ChangeSink,
    window: Vec<Document>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, Collection>,
    subscriptions: Vec<Subscription>,
    next_subscription_id: u64,
    last_timestamp: Option<DateTime<Utc>>,
    outage: Option<String>,
    read_latency: Option<Duration>,
}

impl Inner {
    fn check_available(&self) -> StoreResult<()> {
        match &self.outage {
            Some(reason) => Err(StoreError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn run(&self, query: &Query) -> Vec<Document> {
        query.window(self.documents(&query.collection))
    }

    /// Monotonic commit timestamp
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_timestamp {
            Some(last) if now <= last => last + chrono::Duration::nanoseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(stamp);
        stamp
    }

    fn notify(&mut self) {
        let mut windows = Vec::with_capacity(self.subscriptions.len());
        for sub in &self.subscriptions {
            windows.push(self.run(&sub.query));
        }

        for (sub, window) in self.subscriptions.iter_mut().zip(windows) {
            let changes = diff_windows(&sub.window, &window);
            sub.window = window;
            if changes.is_empty() {
                continue;
            }
            if !sub.sink.send_batch(changes) {
                debug!(subscription_id = sub.id, "Subscriber detached");
            }
        }

        self.subscriptions.retain(|sub| !sub.sink.is_closed());
    }
}

fn diff_windows(old: &[Document], new: &[Document]) -> Vec<DocumentChange> {
    let previous: HashMap<&str, &Document> = old.iter().map(|d| (d.id.as_str(), d)).collect();
    let current: HashSet<&str> = new.iter().map(|d| d.id.as_str()).collect();

    let mut changes = Vec::new();
    for doc in old {
        if !current.contains(doc.id.as_str()) {
            changes.push(DocumentChange::new(ChangeType::Removed, doc.clone()));
        }
    }
    for doc in new {
        match previous.get(doc.id.as_str()) {
            None => changes.push(DocumentChange::new(ChangeType::Added, doc.clone())),
            Some(prev) if prev.fields != doc.fields => {
                changes.push(DocumentChange::new(ChangeType::Modified, doc.clone()))
            }
            Some(_) => {}
        }
    }
    changes
}

fn stamp(doc: NewDocument, timestamp: &str) -> Fields {
    let NewDocument {
        mut fields,
        timestamp_field,
    } = doc;
    if let Some(field) = timestamp_field {
        fields.insert(field, Value::String(timestamp.to_string()));
    }
    fields
}

fn existing<'a>(
    collections: &'a mut HashMap<String, Collection>,
    collection: &str,
    id: &str,
) -> StoreResult<&'a mut Fields> {
    collections
        .get_mut(collection)
        .and_then(|docs| docs.get_mut(id))
        .ok_or_else(|| StoreError::not_found(collection, id))
}

fn apply_write(
    collections: &mut HashMap<String, Collection>,
    write: Write,
    timestamp: &str,
) -> StoreResult<Option<String>> {
    match write {
        Write::Create { collection, doc } => {
            let id = Uuid::new_v4().simple().to_string();
            collections
                .entry(collection)
                .or_default()
                .insert(id.clone(), stamp(doc, timestamp));
            Ok(Some(id))
        }
        Write::Put {
            collection,
            id,
            doc,
        } => {
            collections
                .entry(collection)
                .or_default()
                .insert(id, stamp(doc, timestamp));
            Ok(None)
        }
        Write::Update {
            collection,
            id,
            fields,
        } => {
            let target = existing(collections, &collection, &id)?;
            for (key, value) in fields {
                target.insert(key, value);
            }
            Ok(None)
        }
        Write::SetField {
            collection,
            id,
            field,
            op,
            value,
        } => {
            let target = existing(collections, &collection, &id)?;
            let slot = target.entry(field).or_insert_with(|| Value::Array(Vec::new()));
            if !slot.is_array() {
                *slot = Value::Array(Vec::new());
            }
            if let Value::Array(items) = slot {
                match op {
                    SetOp::Add => {
                        if !items.contains(&value) {
                            items.push(value);
                        }
                    }
                    SetOp::Remove => items.retain(|item| item != &value),
                }
            }
            Ok(None)
        }
        Write::Increment {
            collection,
            id,
            field,
            delta,
        } => {
            let target = existing(collections, &collection, &id)?;
            let current = target.get(&field).and_then(Value::as_i64).unwrap_or(0);
            target.insert(field, Value::from(current.saturating_add(delta)));
            Ok(None)
        }
    }
}

/// In-memory [`DocumentStore`] with live change delivery
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with `Unavailable` until cleared
    pub fn set_outage(&self, reason: Option<&str>) {
        self.inner.lock().outage = reason.map(str::to_string);
    }

    /// Delay read responses; the result is computed before the delay
    pub fn set_read_latency(&self, latency: Option<Duration>) {
        self.inner.lock().read_latency = latency;
    }

    /// Terminate every open change stream with an error
    pub fn fail_subscriptions(&self, reason: &str) {
        let mut inner = self.inner.lock();
        let count = inner.subscriptions.len();
        for sub in inner.subscriptions.drain(..) {
            sub.sink.fail(StoreError::Unavailable(reason.to_string()));
        }
        warn!(subscriptions = count, reason = %reason, "Change streams terminated");
    }

    /// Number of attached change streams
    pub fn subscription_count(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.subscriptions.retain(|sub| !sub.sink.is_closed());
        inner.subscriptions.len()
    }

    /// Delete a document; deleting a missing document is a no-op
    pub fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        inner.check_available()?;
        let removed = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some();
        if removed {
            debug!(collection = %collection, id = %id, "Document deleted");
            inner.notify();
        }
        Ok(())
    }

    async fn delay_read(&self) {
        let latency = self.inner.lock().read_latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch(&self, query: &Query) -> StoreResult<Vec<Document>> {
        query.validate()?;
        let docs = {
            let inner = self.inner.lock();
            inner.check_available()?;
            inner.run(query)
        };
        self.delay_read().await;
        debug!(collection = %query.collection, count = docs.len(), "Fetched documents");
        Ok(docs)
    }

    async fn subscribe(&self, query: &Query) -> StoreResult<ChangeStream> {
        query.validate()?;
        let mut inner = self.inner.lock();
        inner.check_available()?;

        let window = inner.run(query);
        let (sink, stream) = ChangeStream::channel();
        let initial = window
            .iter()
            .cloned()
            .map(|doc| DocumentChange::new(ChangeType::Added, doc))
            .collect();
        sink.send_batch(initial);

        let id = inner.next_subscription_id;
        inner.next_subscription_id += 1;
        inner.subscriptions.push(Subscription {
            id,
            query: query.clone(),
            sink,
            window,
        });

        info!(subscription_id = id, collection = %query.collection, "Change stream attached");
        Ok(stream)
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Document> {
        let doc = {
            let inner = self.inner.lock();
            inner.check_available()?;
            inner
                .collections
                .get(collection)
                .and_then(|docs| docs.get(id))
                .map(|fields| Document::new(id, fields.clone()))
        };
        self.delay_read().await;
        doc.ok_or_else(|| StoreError::not_found(collection, id))
    }

    async fn commit(&self, writes: Vec<Write>) -> StoreResult<Vec<String>> {
        let mut inner = self.inner.lock();
        inner.check_available()?;

        let timestamp = inner
            .next_timestamp()
            .to_rfc3339_opts(SecondsFormat::Nanos, true);

        // All-or-nothing: apply to a copy and swap only on success
        let mut staged = inner.collections.clone();
        let mut created = Vec::new();
        let count = writes.len();
        for write in writes {
            if let Some(id) = apply_write(&mut staged, write, &timestamp)? {
                created.push(id);
            }
        }
        inner.collections = staged;
        inner.notify();

        debug!(writes = count, created = created.len(), "Committed writes");
        Ok(created)
    }
}
