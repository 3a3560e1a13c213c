//! Fallback polling while the WebSocket is down.
//!
//! The poller is only active while the connection state is anything but
//! `CONNECTED`. It fetches every target immediately on activation and then
//! once per interval. When the connection comes back, a fetch in flight is
//! abandoned and its result is never published.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use navbat_server::domain::{OrganizationId, PhoneNumber, QueueItem};
use tokio::{sync::watch, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use crate::{connection::ConnectionState, error::ClientError, feed::QueueFeed};

/// `time::interval` panics on a zero period
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// What a snapshot covers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SnapshotTarget {
    /// Active entries held by a phone number, across organizations
    Phone(PhoneNumber),
    /// Live queue (WAITING and CALLED) of an organization
    Organization(OrganizationId),
}

impl SnapshotTarget {
    /// Whether `item` belongs to this target
    pub fn matches(&self, item: &QueueItem) -> bool {
        match self {
            Self::Phone(phone) => &item.user_phone == phone,
            Self::Organization(organization_id) => &item.organization_id == organization_id,
        }
    }
}

impl fmt::Display for SnapshotTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Phone(phone) => write!(f, "phone:{phone}"),
            Self::Organization(organization_id) => write!(f, "org:{organization_id}"),
        }
    }
}

/// Where snapshots come from (the REST API in production)
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, target: &SnapshotTarget) -> Result<Vec<QueueItem>, ClientError>;
}

/// Publish a fresh snapshot of every target. Failures are logged and skipped.
async fn fetch_all(source: &dyn SnapshotSource, feed: &QueueFeed, targets: &[SnapshotTarget]) {
    for target in targets {
        match source.fetch(target).await {
            Ok(items) => {
                feed.publish_snapshot(target.clone(), items);
            }
            Err(e) => tracing::warn!(snapshot = %target, "Snapshot fetch failed: {}", e),
        }
    }
}

pub struct FallbackPoller {
    source: Arc<dyn SnapshotSource>,
    feed: QueueFeed,
    targets: Vec<SnapshotTarget>,
    interval: Duration,
}

impl FallbackPoller {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        feed: QueueFeed,
        targets: Vec<SnapshotTarget>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            feed,
            targets,
            interval,
        }
    }

    pub fn spawn(
        self,
        state: watch::Receiver<ConnectionState>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(state, cancel))
    }

    pub async fn run(self, mut state: watch::Receiver<ConnectionState>, cancel: CancellationToken) {
        loop {
            // dormant while connected
            tokio::select! {
                () = cancel.cancelled() => return,
                result = state.wait_for(|s| !s.is_connected()) => {
                    if result.is_err() {
                        return;
                    }
                }
            }

            tracing::info!(
                interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
                "WebSocket unavailable, polling snapshots"
            );
            if !self.poll_until_connected(&mut state, &cancel).await {
                return;
            }
            tracing::info!("WebSocket connected, polling stopped");
        }
    }

    /// Returns `false` when the poller should exit.
    async fn poll_until_connected(
        &self,
        state: &mut watch::Receiver<ConnectionState>,
        cancel: &CancellationToken,
    ) -> bool {
        let mut ticker = time::interval(self.interval.max(MIN_POLL_INTERVAL));
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            let connected = tokio::select! {
                () = cancel.cancelled() => return false,
                result = state.wait_for(|s| s.is_connected()) => Some(result.is_ok()),
                _ = ticker.tick() => None,
            };
            if let Some(keep_running) = connected {
                return keep_running;
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => return false,
                result = state.wait_for(|s| s.is_connected()) => {
                    tracing::debug!("Abandoning in-flight snapshot fetch");
                    return result.is_ok();
                }
                () = fetch_all(self.source.as_ref(), &self.feed, &self.targets) => {}
            }
        }
    }
}
