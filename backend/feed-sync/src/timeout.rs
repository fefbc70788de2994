use crate::error::{SyncError, SyncResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

/// Race `future` against an optional deadline.
///
/// With no deadline the future runs to completion. On expiry the future is
/// dropped and `SyncError::Timeout` is returned; nothing is retried here.
pub async fn with_deadline<F, T>(deadline: Option<Duration>, future: F) -> SyncResult<T>
where
    F: Future<Output = SyncResult<T>>,
{
    let Some(limit) = deadline else {
        return future.await;
    };

    match timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => {
            warn!(timeout_ms = limit.as_millis() as u64, "Operation deadline elapsed");
            Err(SyncError::Timeout(limit))
        }
    }
}
