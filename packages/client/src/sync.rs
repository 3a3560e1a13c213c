//! Bridges live events into the feed and resyncs after reconnecting.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use navbat_server::domain::{QueueEvent, QueueItem, QueueItemId};
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    connection::ConnectionState,
    feed::QueueFeed,
    poller::{SnapshotSource, SnapshotTarget},
};

/// How far an item has progressed. Every transition appends a log entry and,
/// between transitions, a WAITING position only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct ItemVersion {
    transitions: usize,
    position: Reverse<u32>,
}

impl ItemVersion {
    fn of(item: &QueueItem) -> Self {
        Self {
            transitions: item.logs.len(),
            position: Reverse(item.position.unwrap_or(0)),
        }
    }
}

/// Forwards WebSocket events to the [`QueueFeed`]. Every time the connection
/// reaches `CONNECTED` (and whenever events were lost to lag) it fetches a
/// fresh snapshot of each target, covering whatever happened while offline.
///
/// Events still buffered from before a snapshot was read are dropped when
/// the snapshot already shows a later state of the same item.
pub struct QueueSync {
    source: Arc<dyn SnapshotSource>,
    feed: QueueFeed,
    targets: Vec<SnapshotTarget>,
    snapshot_versions: HashMap<QueueItemId, ItemVersion>,
}

impl QueueSync {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        feed: QueueFeed,
        targets: Vec<SnapshotTarget>,
    ) -> Self {
        Self {
            source,
            feed,
            targets,
            snapshot_versions: HashMap::new(),
        }
    }

    pub fn spawn(
        self,
        events: broadcast::Receiver<QueueEvent>,
        state: watch::Receiver<ConnectionState>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(events, state, cancel))
    }

    pub async fn run(
        mut self,
        mut events: broadcast::Receiver<QueueEvent>,
        mut state: watch::Receiver<ConnectionState>,
        cancel: CancellationToken,
    ) {
        if state.borrow_and_update().is_connected() {
            self.resync().await;
        }

        loop {
            tokio::select! {
                () = cancel.cancelled() => return,
                event = events.recv() => match event {
                    Ok(event) => self.forward(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Event consumer lagged, resyncing");
                        self.resync().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                },
                changed = state.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    let current = *state.borrow_and_update();
                    if current.is_connected() {
                        self.resync().await;
                    }
                }
            }
        }
    }

    fn forward(&mut self, event: QueueEvent) {
        let item = event.item();
        if let Some(&seen) = self.snapshot_versions.get(&item.id) {
            if ItemVersion::of(item) <= seen {
                tracing::debug!(item_id = %item.id, "Dropping event older than the snapshot");
                return;
            }
            self.snapshot_versions.remove(&item.id);
        }
        self.feed.publish_event(event);
    }

    async fn resync(&mut self) {
        if self.targets.is_empty() {
            return;
        }
        tracing::debug!(targets = self.targets.len(), "Resyncing snapshots");
        self.snapshot_versions.clear();
        for target in &self.targets {
            match self.source.fetch(target).await {
                Ok(items) => {
                    self.snapshot_versions
                        .extend(items.iter().map(|item| (item.id.clone(), ItemVersion::of(item))));
                    self.feed.publish_snapshot(target.clone(), items);
                }
                Err(e) => tracing::warn!(snapshot = %target, "Snapshot fetch failed: {}", e),
            }
        }
    }
}
