//! Ready-made client: connection manager, fallback poller and resync wired
//! to one [`QueueFeed`].

use std::sync::Arc;

use navbat_server::domain::OrganizationId;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    config::ClientConfig,
    connection::{ConnectionManager, ConnectionState, Connector, TungsteniteConnector},
    error::ClientError,
    feed::QueueFeed,
    poller::{FallbackPoller, SnapshotSource, SnapshotTarget},
    rest::RestClient,
    subscription::ChannelSubscription,
    sync::QueueSync,
};

pub struct QueueClient {
    manager: ConnectionManager,
    feed: QueueFeed,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl QueueClient {
    /// Connect to `config.server_url` over WebSocket and REST.
    ///
    /// `targets` are polled while the WebSocket is down and resynced after
    /// every reconnect.
    pub fn start(config: &ClientConfig, targets: Vec<SnapshotTarget>) -> Result<Self, ClientError> {
        let connector = Arc::new(TungsteniteConnector::new(config.ws_url()?));
        let rest = Arc::new(RestClient::new(&config.server_url)?);
        Ok(Self::with_parts(connector, rest, config, targets))
    }

    pub fn with_parts(
        connector: Arc<dyn Connector>,
        source: Arc<dyn SnapshotSource>,
        config: &ClientConfig,
        targets: Vec<SnapshotTarget>,
    ) -> Self {
        let manager = ConnectionManager::spawn(connector, config);
        let feed = QueueFeed::new(config.event_buffer);
        let cancel = CancellationToken::new();

        let sync = QueueSync::new(source.clone(), feed.clone(), targets.clone()).spawn(
            manager.events(),
            manager.watch_state(),
            cancel.clone(),
        );
        let poller = FallbackPoller::new(source, feed.clone(), targets, config.poll_interval)
            .spawn(manager.watch_state(), cancel.clone());

        manager.connect();

        Self {
            manager,
            feed,
            cancel,
            tasks: vec![sync, poller],
        }
    }

    pub fn subscribe(&self, channel: OrganizationId) -> ChannelSubscription {
        self.manager.subscribe(channel)
    }

    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    pub fn feed(&self) -> &QueueFeed {
        &self.feed
    }

    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.manager.shutdown().await;
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!("Client task ended abnormally: {}", e);
            }
        }
    }
}
