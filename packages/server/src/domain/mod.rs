//! Domain layer for the queue service.
//!
//! This module contains business logic that is independent of
//! data transfer objects (DTOs) and infrastructure concerns.

pub mod entity;
pub mod error;
pub mod event;
pub mod factory;
pub mod repository;
pub mod state_machine;
pub mod value_object;

pub use entity::{
    DEFAULT_SERVICE_MINUTES, OrganizationQueue, QueueItem, QueueLog, TransitionContext,
};
pub use error::{QueueError, ValueObjectError};
pub use event::{EventPublisher, EventType, PublishError, QueueEvent};
pub use factory::{ConnectionIdFactory, QueueItemIdFactory};
pub use repository::{NewQueueEntry, QueueRepository};
pub use state_machine::{QueueStateMachine, QueueStatus, Transition};
pub use value_object::{
    ConnectionId, OrganizationId, PhoneNumber, QueueItemId, ServiceId, Timestamp,
};

#[cfg(test)]
pub use event::MockEventPublisher;
#[cfg(test)]
pub use repository::MockQueueRepository;
