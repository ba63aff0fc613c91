//! Background removal of expired code records for backends without native TTL.

use std::future::Future;

use chrono::{Duration, Utc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::domain::repository::CodeStorage;
use crate::error::StorageError;

/// Delete every record whose validity window has closed. Returns the number removed.
pub async fn sweep<S: CodeStorage>(storage: &S, ttl: Duration) -> Result<u64, StorageError> {
    let cutoff = Utc::now() - ttl;
    let purged = storage.purge_expired(cutoff).await?;
    if purged > 0 {
        info!(purged, "expired onetime codes purged");
    } else {
        debug!("no expired onetime codes");
    }
    Ok(purged)
}

/// Run [`sweep`] every `interval` until `shutdown` resolves.
///
/// The first sweep runs immediately. Failures are logged and the loop keeps going.
pub async fn run_reaper<S, F>(
    storage: &S,
    ttl: Duration,
    interval: std::time::Duration,
    shutdown: F,
) where
    S: CodeStorage,
    F: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    info!(
        ttl_secs = ttl.num_seconds(),
        interval_secs = interval.as_secs(),
        "onetime code reaper started"
    );
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                if let Err(e) = sweep(storage, ttl).await {
                    warn!(error = ?e, "onetime code reaper sweep failed");
                }
            }
        }
    }
    info!("onetime code reaper stopped");
}
