//! Error types for feed synchronization

use doc_store::StoreError;
use feed_schema::ValidationError;
use std::time::Duration;
use thiserror::Error;

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Error, Debug)]
pub enum SyncError {
    /// A bounded operation missed its deadline
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Store error: {0}")]
    Store(String),

    /// Single-entity load found nothing; callers branch on this
    #[error("Not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// Caller-supplied content rejected before any remote call
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to decode document {id}: {source}")]
    Decode {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SyncError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        SyncError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    /// Whether the caller may retry the same operation unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Timeout(_) | SyncError::StoreUnavailable(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound { .. })
    }
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => SyncError::StoreUnavailable(msg),
            StoreError::NotFound { collection, id } => SyncError::NotFound { collection, id },
            StoreError::Rejected(msg) => SyncError::Store(format!("request rejected: {}", msg)),
            StoreError::Serialization(msg) => SyncError::Store(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_taxonomy() {
        let err: SyncError = StoreError::Unavailable("reset".into()).into();
        assert!(matches!(err, SyncError::StoreUnavailable(_)));
        assert!(err.is_retryable());

        let err: SyncError = StoreError::not_found("users", "u1").into();
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "Not found: users/u1");

        let err: SyncError = StoreError::Rejected("too many values".into()).into();
        assert!(matches!(err, SyncError::Store(_)));
    }

    #[test]
    fn test_timeout_is_retryable() {
        let err = SyncError::Timeout(Duration::from_secs(8));
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "Operation timed out after 8s");
    }

    #[test]
    fn test_validation_error_converts() {
        let err: SyncError = ValidationError::Empty("comment").into();
        assert!(matches!(err, SyncError::Validation(_)));
        assert!(!err.is_retryable());
    }
}
