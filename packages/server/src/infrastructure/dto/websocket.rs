//! WebSocket message DTOs for the queue service.
//!
//! Both directions are JSON objects tagged by a `type` field.

use serde::{Deserialize, Serialize};

use crate::domain::{EventType, OrganizationId, QueueEvent, QueueItem};

/// Messages sent by clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Start receiving events for an organization
    Subscribe {
        #[serde(rename = "orgId", alias = "organizationId")]
        org_id: OrganizationId,
    },
    /// Stop receiving events for an organization
    Unsubscribe {
        #[serde(rename = "orgId", alias = "organizationId")]
        org_id: OrganizationId,
    },
    /// Application-level keepalive, answered with `PONG`
    Ping,
}

/// Payload shared by all queue events on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub organization_id: OrganizationId,
    pub data: QueueItem,
    /// Unix milliseconds at publish time
    #[serde(default)]
    pub timestamp: i64,
}

/// Messages sent by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// First message after the upgrade
    ConnectionAck {
        connection_id: String,
        message: String,
        timestamp: i64,
    },
    Pong {
        timestamp: i64,
    },
    QueueJoined(EventEnvelope),
    QueueCalled(EventEnvelope),
    QueueServed(EventEnvelope),
    QueueSkipped(EventEnvelope),
    QueueCancelled(EventEnvelope),
    PositionUpdate(EventEnvelope),
}

impl ServerMessage {
    /// Wrap a domain event for the wire
    pub fn from_event(event: &QueueEvent, timestamp: i64) -> Self {
        let envelope = EventEnvelope {
            organization_id: event.organization_id().clone(),
            data: event.item().clone(),
            timestamp,
        };
        match event.event_type() {
            EventType::QueueJoined => Self::QueueJoined(envelope),
            EventType::QueueCalled => Self::QueueCalled(envelope),
            EventType::QueueServed => Self::QueueServed(envelope),
            EventType::QueueSkipped => Self::QueueSkipped(envelope),
            EventType::QueueCancelled => Self::QueueCancelled(envelope),
            EventType::PositionUpdate => Self::PositionUpdate(envelope),
        }
    }

    /// The domain event carried by this message, if it is one
    pub fn into_event(self) -> Option<QueueEvent> {
        let (event_type, envelope) = match self {
            Self::QueueJoined(e) => (EventType::QueueJoined, e),
            Self::QueueCalled(e) => (EventType::QueueCalled, e),
            Self::QueueServed(e) => (EventType::QueueServed, e),
            Self::QueueSkipped(e) => (EventType::QueueSkipped, e),
            Self::QueueCancelled(e) => (EventType::QueueCancelled, e),
            Self::PositionUpdate(e) => (EventType::PositionUpdate, e),
            Self::ConnectionAck { .. } | Self::Pong { .. } => return None,
        };
        Some(QueueEvent::from_parts(event_type, envelope.data))
    }
}
