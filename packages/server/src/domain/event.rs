//! Domain events produced by queue transitions and the port that publishes them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::{entity::QueueItem, value_object::OrganizationId};

/// Wire name of a queue event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    QueueJoined,
    QueueCalled,
    QueueServed,
    QueueSkipped,
    QueueCancelled,
    PositionUpdate,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QueueJoined => "QUEUE_JOINED",
            Self::QueueCalled => "QUEUE_CALLED",
            Self::QueueServed => "QUEUE_SERVED",
            Self::QueueSkipped => "QUEUE_SKIPPED",
            Self::QueueCancelled => "QUEUE_CANCELLED",
            Self::PositionUpdate => "POSITION_UPDATE",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that happened to a queue item. Carries the item as it is after
/// the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    Joined(QueueItem),
    Called(QueueItem),
    Served(QueueItem),
    Skipped(QueueItem),
    Cancelled(QueueItem),
    PositionUpdated(QueueItem),
}

impl QueueEvent {
    /// Rebuild an event from its wire type and payload
    pub fn from_parts(event_type: EventType, item: QueueItem) -> Self {
        match event_type {
            EventType::QueueJoined => Self::Joined(item),
            EventType::QueueCalled => Self::Called(item),
            EventType::QueueServed => Self::Served(item),
            EventType::QueueSkipped => Self::Skipped(item),
            EventType::QueueCancelled => Self::Cancelled(item),
            EventType::PositionUpdate => Self::PositionUpdated(item),
        }
    }

    pub fn event_type(&self) -> EventType {
        match self {
            Self::Joined(_) => EventType::QueueJoined,
            Self::Called(_) => EventType::QueueCalled,
            Self::Served(_) => EventType::QueueServed,
            Self::Skipped(_) => EventType::QueueSkipped,
            Self::Cancelled(_) => EventType::QueueCancelled,
            Self::PositionUpdated(_) => EventType::PositionUpdate,
        }
    }

    pub fn item(&self) -> &QueueItem {
        match self {
            Self::Joined(item)
            | Self::Called(item)
            | Self::Served(item)
            | Self::Skipped(item)
            | Self::Cancelled(item)
            | Self::PositionUpdated(item) => item,
        }
    }

    pub fn into_item(self) -> QueueItem {
        match self {
            Self::Joined(item)
            | Self::Called(item)
            | Self::Served(item)
            | Self::Skipped(item)
            | Self::Cancelled(item)
            | Self::PositionUpdated(item) => item,
        }
    }

    /// The channel this event is routed on
    pub fn organization_id(&self) -> &OrganizationId {
        &self.item().organization_id
    }
}

/// Errors raised while publishing an event
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("failed to serialize event: {0}")]
    Serialization(String),
}

/// Outbound port for domain events.
///
/// Publishing is best-effort. A failure never undoes the mutation that
/// produced the event.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Deliver `event` to the interested connections.
    ///
    /// Returns the number of connections the event was handed to.
    async fn publish(&self, event: &QueueEvent) -> Result<usize, PublishError>;
}
