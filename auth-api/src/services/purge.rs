//! Periodic sweep of refresh token records that can no longer be redeemed.

use std::future::Future;
use std::time::Duration;

use crate::services::StorageError;

/// Call `purge` once per `period` until the task is dropped.
///
/// Failures are logged and the sweep keeps running.
pub async fn purge_periodically<F, Fut>(period: Duration, purge: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<u64, StorageError>>,
{
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        match purge().await {
            Ok(0) => {}
            Ok(purged) => tracing::debug!(purged, "Expired refresh tokens purged"),
            Err(e) => tracing::warn!(error = %e, "Failed to purge expired refresh tokens"),
        }
    }
}
