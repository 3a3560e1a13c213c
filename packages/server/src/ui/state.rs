//! Server state shared by the HTTP and WebSocket handlers.

use serde::Deserialize;
use std::sync::Arc;

use crate::{
    domain::{EventPublisher, QueueRepository},
    infrastructure::{
        realtime::{Broadcaster, ConnectionRegistry},
        repository::InMemoryQueueRepository,
    },
    ui::config::ServerConfig,
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

/// Shared application state
pub struct AppState {
    /// Repository（データアクセス層の抽象化）
    pub repository: Arc<dyn QueueRepository>,
    /// 接続中のクライアント
    pub registry: Arc<ConnectionRegistry>,
    pub broadcaster: Arc<Broadcaster>,
    pub config: ServerConfig,
}

impl AppState {
    /// Wire the in-memory repository and the broadcaster together
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Arc::new(Broadcaster::new(
            registry.clone(),
            config.require_subscription,
        ));
        Self {
            repository: Arc::new(InMemoryQueueRepository::new(config.service_minutes)),
            registry,
            broadcaster,
            config,
        }
    }

    pub fn publisher(&self) -> Arc<dyn EventPublisher> {
        self.broadcaster.clone()
    }

    /// An empty token list accepts every client.
    pub fn token_allowed(&self, token: Option<&str>) -> bool {
        if self.config.access_tokens.is_empty() {
            return true;
        }
        token.is_some_and(|t| self.config.access_tokens.iter().any(|allowed| allowed == t))
    }
}
