//! Connectivity tracking and queue replay on reconnect

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::services::offline_queue::{OfflineQueue, ReplayReport};
use crate::services::WorkoutApi;

/// Online/offline signal shared by the app.
///
/// Only real transitions are published, so repeated "online" reports do not
/// wake the sync worker.
#[derive(Debug, Clone)]
pub struct Connectivity {
    tx: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            tracing::info!(online, "connectivity changed");
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Replays the offline queue whenever connectivity comes back.
///
/// Replays run one at a time on a single task. Transitions that arrive while
/// a replay is in flight collapse into the latest state, so a flapping
/// connection triggers at most one follow-up replay.
pub struct SyncWorker<A: ?Sized> {
    queue: Arc<OfflineQueue>,
    api: Arc<A>,
}

impl<A: WorkoutApi + ?Sized + 'static> SyncWorker<A> {
    pub fn new(queue: Arc<OfflineQueue>, api: Arc<A>) -> Self {
        Self { queue, api }
    }

    /// Replay immediately, regardless of the connectivity signal
    pub async fn sync_now(&self) -> ReplayReport {
        if self.queue.is_empty() {
            return ReplayReport::default();
        }
        let report = self.queue.replay(self.api.as_ref()).await;
        tracing::info!(
            synced = report.synced,
            rejected = report.rejected,
            remaining = report.remaining,
            "offline queue replay finished"
        );
        report
    }

    /// Wait for online transitions until the signal is dropped
    pub async fn run(self, mut online: watch::Receiver<bool>) {
        while online.changed().await.is_ok() {
            let is_online = *online.borrow_and_update();
            if is_online {
                self.sync_now().await;
            }
        }
        tracing::debug!("connectivity signal closed, sync worker stopping");
    }

    pub fn spawn(self, connectivity: &Connectivity) -> JoinHandle<()> {
        let rx = connectivity.subscribe();
        tokio::spawn(self.run(rx))
    }
}
