//! Periodic staleness check on a tokio runtime.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::CatalogSync;
use crate::models::Medicine;

/// Handle to the background refresh task. Dropping it stops the task.
pub struct BackgroundSync {
    handle: JoinHandle<()>,
    rx: watch::Receiver<Vec<Medicine>>,
}

impl BackgroundSync {
    /// A receiver that observes every published collection.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Medicine>> {
        self.rx.clone()
    }

    /// The most recently published collection.
    pub fn latest(&self) -> Vec<Medicine> {
        self.rx.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop the task. Nothing is published afterwards.
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for BackgroundSync {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Check staleness every `period` and refresh when due.
///
/// The first check runs immediately. Must be called within a tokio runtime.
pub fn spawn_background_sync(sync: Arc<CatalogSync>, period: Duration) -> BackgroundSync {
    let (tx, rx) = watch::channel(sync.cached());

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = tx.closed() => {
                    tracing::debug!("All subscribers gone, stopping background sync");
                    break;
                }
            }

            if !sync.should_sync() {
                continue;
            }

            tracing::debug!("Catalog is stale, refreshing");
            let medicines = sync.get_all().await;
            if tx.send(medicines).is_err() {
                break;
            }
        }
    });

    BackgroundSync { handle, rx }
}
