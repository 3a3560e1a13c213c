//! Consumer-facing stream of queue updates.
//!
//! Live events and REST snapshots (from fallback polling or a post-reconnect
//! resync) are merged into one channel. A snapshot identical to the last one
//! published for the same target is dropped.

use std::collections::HashMap;
use std::sync::Arc;

use navbat_server::domain::{OrganizationId, QueueEvent, QueueItem, QueueItemId};
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::poller::SnapshotTarget;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueUpdate {
    /// Pushed by the server over WebSocket
    Event(QueueEvent),
    /// Full state of a target fetched over REST
    Snapshot {
        target: SnapshotTarget,
        items: Vec<QueueItem>,
    },
}

#[derive(Clone)]
pub struct QueueFeed {
    tx: broadcast::Sender<QueueUpdate>,
    last_snapshots: Arc<Mutex<HashMap<SnapshotTarget, Vec<QueueItem>>>>,
}

impl QueueFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            last_snapshots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueUpdate> {
        self.tx.subscribe()
    }

    pub fn publish_event(&self, event: QueueEvent) {
        let _ = self.tx.send(QueueUpdate::Event(event));
    }

    /// Returns `false` when the snapshot equals the previous one for `target`.
    pub fn publish_snapshot(&self, target: SnapshotTarget, items: Vec<QueueItem>) -> bool {
        {
            let mut last = self.last_snapshots.lock();
            if last.get(&target) == Some(&items) {
                tracing::debug!(snapshot = %target, "Snapshot unchanged, skipping");
                return false;
            }
            last.insert(target.clone(), items.clone());
        }
        let _ = self.tx.send(QueueUpdate::Snapshot { target, items });
        true
    }
}

/// Local view of the queues a client follows, built from [`QueueUpdate`]s.
#[derive(Debug, Default, Clone)]
pub struct QueueBoard {
    items: HashMap<QueueItemId, QueueItem>,
}

impl QueueBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, update: &QueueUpdate) {
        match update {
            QueueUpdate::Event(event) => {
                let item = event.item();
                if item.status.is_terminal() {
                    self.items.remove(&item.id);
                } else {
                    self.items.insert(item.id.clone(), item.clone());
                }
            }
            QueueUpdate::Snapshot { target, items } => {
                self.items.retain(|_, item| !target.matches(item));
                for item in items.iter().filter(|item| item.status.is_active()) {
                    self.items.insert(item.id.clone(), item.clone());
                }
            }
        }
    }

    pub fn get(&self, id: &QueueItemId) -> Option<&QueueItem> {
        self.items.get(id)
    }

    /// Active items of an organization: waiting ones by position, then called ones.
    pub fn organization(&self, organization_id: &OrganizationId) -> Vec<QueueItem> {
        let mut items: Vec<QueueItem> = self
            .items
            .values()
            .filter(|item| &item.organization_id == organization_id)
            .cloned()
            .collect();
        items.sort_by_key(|item| (item.position.unwrap_or(u32::MAX), item.number));
        items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
