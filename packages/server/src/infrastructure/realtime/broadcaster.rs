//! Event fan-out to connected WebSocket clients.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::registry::ConnectionRegistry;
use crate::{
    domain::{EventPublisher, OrganizationId, PublishError, QueueEvent},
    infrastructure::dto::websocket::ServerMessage,
};

/// Delivers server messages to the connections interested in a channel.
///
/// Delivery to one connection never waits on another: each send is a
/// non-blocking enqueue, and a connection whose queue is full or closed is
/// removed from the registry and told to close.
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
    /// When set, connections without subscriptions receive nothing.
    require_subscription: bool,
}

impl Broadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>, require_subscription: bool) -> Self {
        Self {
            registry,
            require_subscription,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Send `message` to every connection accepting `channel`.
    ///
    /// Returns the number of connections the message was queued for.
    pub async fn publish_to(
        &self,
        channel: &OrganizationId,
        message: &ServerMessage,
    ) -> Result<usize, PublishError> {
        let json = serde_json::to_string(message)
            .map(Arc::new)
            .map_err(|e| PublishError::Serialization(e.to_string()))?;

        let targets = self.registry.snapshot().await;
        let mut delivered = 0;
        let mut failed = Vec::new();
        for conn in targets
            .iter()
            .filter(|c| c.accepts(channel, self.require_subscription))
        {
            if conn.send(json.clone()) {
                delivered += 1;
            } else {
                failed.push(conn.clone());
            }
        }

        for conn in failed {
            warn!(
                conn_id = %conn.id,
                organization_id = %channel,
                dropped = conn.drop_count(),
                "Send queue full or closed, dropping connection"
            );
            conn.close();
            let _ = self.registry.remove(&conn.id).await;
        }

        debug!(organization_id = %channel, recipients = delivered, "Broadcast to channel");
        Ok(delivered)
    }
}

#[async_trait]
impl EventPublisher for Broadcaster {
    async fn publish(&self, event: &QueueEvent) -> Result<usize, PublishError> {
        let message = ServerMessage::from_event(event, navbat_shared::time::now_millis());
        self.publish_to(event.organization_id(), &message).await
    }
}
