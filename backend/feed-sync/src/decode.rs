//! Store documents to typed entities
//!
//! Missing optional fields default inside the entity schemas; only documents
//! whose fields have the wrong shape fail here. Batch decoders log and skip
//! those so one bad document never stalls a feed.

use crate::error::{SyncError, SyncResult};
use doc_store::{ChangeType, Document, DocumentChange};
use feed_schema::{ChangeEvent, Entity};
use serde_json::Value;
use tracing::warn;

pub fn decode<T: Entity>(doc: &Document) -> SyncResult<T> {
    let mut entity: T =
        serde_json::from_value(Value::Object(doc.fields.clone())).map_err(|source| {
            SyncError::Decode {
                id: doc.id.clone(),
                source,
            }
        })?;
    entity.set_id(doc.id.clone());
    Ok(entity)
}

/// Decode one change. A removal carries only the identity, so its fields
/// are never decoded and a malformed body cannot drop it.
pub fn decode_change<T: Entity>(change: &DocumentChange) -> SyncResult<ChangeEvent<T>> {
    Ok(match change.change_type {
        ChangeType::Added => ChangeEvent::added(decode(&change.doc)?),
        ChangeType::Modified => ChangeEvent::modified(decode(&change.doc)?),
        ChangeType::Removed => ChangeEvent::removed(identity_only(&change.doc.id)),
    })
}

fn identity_only<T: Entity>(id: &str) -> T {
    let mut entity = T::default();
    entity.set_id(id.to_string());
    entity
}

/// Decode a change batch, preserving delivery order
pub fn decode_batch<T: Entity>(changes: &[DocumentChange]) -> Vec<ChangeEvent<T>> {
    changes
        .iter()
        .filter_map(|change| match decode_change(change) {
            Ok(event) => Some(event),
            Err(err) => {
                warn!(
                    doc_id = %change.doc.id,
                    change = ?change.change_type,
                    error = %err,
                    "Skipping malformed change"
                );
                None
            }
        })
        .collect()
}

pub fn decode_all<T: Entity>(docs: &[Document]) -> Vec<T> {
    docs.iter()
        .filter_map(|doc| match decode(doc) {
            Ok(entity) => Some(entity),
            Err(err) => {
                warn!(doc_id = %doc.id, error = %err, "Skipping malformed document");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_schema::{ChangeKind, Post};
    use serde_json::json;

    fn doc(id: &str, fields: Value) -> Document {
        match fields {
            Value::Object(map) => Document::new(id, map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_decode_sets_identity() {
        let post: Post = decode(&doc("p1", json!({"content": "hi"}))).unwrap();
        assert_eq!(post.id, "p1");
        assert_eq!(post.body(), "hi");
    }

    #[test]
    fn test_decode_batch_skips_malformed() {
        let changes = vec![
            DocumentChange::new(ChangeType::Added, doc("p1", json!({"content": "ok"}))),
            DocumentChange::new(ChangeType::Added, doc("p2", json!({"commentCount": "many"}))),
            DocumentChange::new(ChangeType::Removed, doc("p3", json!({}))),
        ];
        let events: Vec<ChangeEvent<Post>> = decode_batch(&changes);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].entity.id, "p1");
        assert_eq!(events[1].kind, ChangeKind::Removed);
    }

    #[test]
    fn test_removal_survives_malformed_body() {
        let changes = vec![DocumentChange::new(
            ChangeType::Removed,
            doc("p1", json!({"commentCount": "many", "likes": 3})),
        )];
        let events: Vec<ChangeEvent<Post>> = decode_batch(&changes);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ChangeKind::Removed);
        assert_eq!(events[0].entity.id, "p1");
    }

    #[test]
    fn test_decode_error_names_document() {
        let err = decode::<Post>(&doc("bad", json!({"likes": 3}))).unwrap_err();
        assert!(matches!(err, SyncError::Decode { ref id, .. } if id == "bad"));
    }
}
