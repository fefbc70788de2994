use crate::document::{Document, Fields, NewDocument};
use crate::error::{StoreError, StoreResult};
use crate::query::Query;
use crate::stream::ChangeStream;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Set-membership operation on an array field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetOp {
    /// Add the value if absent
    Add,
    /// Remove every occurrence of the value
    Remove,
}

/// One write of an atomic batch
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Create a document with a store-assigned id
    Create {
        collection: String,
        doc: NewDocument,
    },
    /// Create or replace a document at a known id
    Put {
        collection: String,
        id: String,
        doc: NewDocument,
    },
    /// Merge plain fields into an existing document
    Update {
        collection: String,
        id: String,
        fields: Fields,
    },
    /// Commutative set add/remove on an array field
    SetField {
        collection: String,
        id: String,
        field: String,
        op: SetOp,
        value: Value,
    },
    /// Commutative counter increment
    Increment {
        collection: String,
        id: String,
        field: String,
        delta: i64,
    },
}

/// Storage collaborator consumed by the feed engine.
///
/// Implementors must provide reads, subscriptions and an atomic `commit`;
/// single-write helpers default to a one-element commit.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// One-shot read of the query window
    async fn fetch(&self, query: &Query) -> StoreResult<Vec<Document>>;

    /// Live subscription to the query window.
    ///
    /// The first batch reports the current window as additions; each later
    /// batch reflects one committed write that changed the window.
    async fn subscribe(&self, query: &Query) -> StoreResult<ChangeStream>;

    /// Read a single document, `NotFound` when absent
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Document>;

    /// Apply all writes atomically; returns ids of created documents in order
    async fn commit(&self, writes: Vec<Write>) -> StoreResult<Vec<String>>;

    async fn create(&self, collection: &str, doc: NewDocument) -> StoreResult<String> {
        let ids = self
            .commit(vec![Write::Create {
                collection: collection.to_string(),
                doc,
            }])
            .await?;
        ids.into_iter()
            .next()
            .ok_or_else(|| StoreError::Rejected("create returned no id".to_string()))
    }

    async fn put(&self, collection: &str, id: &str, doc: NewDocument) -> StoreResult<()> {
        self.commit(vec![Write::Put {
            collection: collection.to_string(),
            id: id.to_string(),
            doc,
        }])
        .await
        .map(|_| ())
    }

    async fn update_fields(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()> {
        self.commit(vec![Write::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        }])
        .await
        .map(|_| ())
    }

    async fn mutate_set_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        op: SetOp,
        value: Value,
    ) -> StoreResult<()> {
        self.commit(vec![Write::SetField {
            collection: collection.to_string(),
            id: id.to_string(),
            field: field.to_string(),
            op,
            value,
        }])
        .await
        .map(|_| ())
    }

    async fn mutate_counter(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> StoreResult<()> {
        self.commit(vec![Write::Increment {
            collection: collection.to_string(),
            id: id.to_string(),
            field: field.to_string(),
            delta,
        }])
        .await
        .map(|_| ())
    }
}
