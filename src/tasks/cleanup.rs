//! Expiry Sweep Task
//!
//! Background task that periodically deletes expired entries from every
//! collection.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{Collection, OfflineCache};

// == Sweep Report ==
/// Outcome of one sweep over all collections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Entries deleted per successfully swept collection
    pub removed: Vec<(Collection, usize)>,
    /// Collections whose sweep failed, with the error message
    pub failed: Vec<(Collection, String)>,
}

impl SweepReport {
    pub fn total_removed(&self) -> usize {
        self.removed.iter().map(|(_, count)| count).sum()
    }

    pub fn removed_from(&self, collection: Collection) -> Option<usize> {
        self.removed
            .iter()
            .find(|(c, _)| *c == collection)
            .map(|(_, count)| *count)
    }
}

/// Runs one sweep over every collection, metadata included.
///
/// A failing collection is logged and recorded in the report; the remaining
/// collections are still swept.
pub async fn sweep_once(cache: &OfflineCache) -> SweepReport {
    let mut report = SweepReport::default();

    for collection in Collection::ALL {
        match cache.remove_expired(collection).await {
            Ok(count) => {
                if count > 0 {
                    info!("Cleaned up {} expired items from {}", count, collection);
                }
                report.removed.push((collection, count));
            }
            Err(err) => {
                warn!("Failed to clean up {}: {}", collection, err);
                report.failed.push((collection, err.to_string()));
            }
        }
    }

    report
}

// == Cleanup Handle ==
/// Owner of the running sweep task.
#[derive(Debug)]
pub struct CleanupHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl CleanupHandle {
    /// Signals the task to stop and waits for it to exit.
    ///
    /// A sweep already in progress finishes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            if !err.is_cancelled() {
                warn!("Cleanup task ended abnormally: {}", err);
            }
        }
    }

    /// Aborts the task immediately.
    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawns a background task that sweeps expired entries every `interval`.
///
/// The first sweep runs one interval after spawning. The task lives until
/// [`CleanupHandle::shutdown`] or [`CleanupHandle::abort`] is called.
///
/// # Example
/// ```ignore
/// let cache = OfflineCache::new(Arc::new(StoreHandle::new("/tmp/cache")));
/// let cleanup = spawn_cleanup_task(cache.clone(), Duration::from_secs(3600));
/// // Later, during shutdown:
/// cleanup.shutdown().await;
/// ```
pub fn spawn_cleanup_task(cache: OfflineCache, interval: Duration) -> CleanupHandle {
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        info!(
            "Starting expiry sweep task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = shutdown_rx.changed() => {
                    // A dropped sender also stops the task
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                    continue;
                }
            }

            let report = sweep_once(&cache).await;
            if report.total_removed() == 0 && report.failed.is_empty() {
                debug!("Expiry sweep: no expired entries found");
            }
        }

        info!("Expiry sweep task stopped");
    });

    CleanupHandle { shutdown, task }
}
