//! Domain layer error definitions.

use thiserror::Error;

use super::state_machine::QueueStatus;

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// OrganizationId validation error
    #[error("OrganizationId cannot be empty")]
    OrganizationIdEmpty,

    /// OrganizationId too long error
    #[error("OrganizationId cannot exceed {max} characters (got {actual})")]
    OrganizationIdTooLong { max: usize, actual: usize },

    /// QueueItemId validation error
    #[error("QueueItemId cannot be empty")]
    QueueItemIdEmpty,

    /// QueueItemId too long error
    #[error("QueueItemId cannot exceed {max} characters (got {actual})")]
    QueueItemIdTooLong { max: usize, actual: usize },

    /// ServiceId validation error
    #[error("ServiceId cannot be empty")]
    ServiceIdEmpty,

    /// PhoneNumber format error
    #[error("PhoneNumber must be 7 to 15 digits with an optional leading '+' (got: {0})")]
    PhoneNumberInvalid(String),

    /// ConnectionId validation error
    #[error("ConnectionId cannot be empty")]
    ConnectionIdEmpty,
}

/// Errors raised by the organization queue aggregate
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The phone already holds a WAITING or CALLED entry at the organization
    #[error("{phone} is already in the queue of organization {organization_id}")]
    AlreadyQueued {
        phone: String,
        organization_id: String,
    },

    /// No active entry with this id
    #[error("queue item not found: {0}")]
    ItemNotFound(String),

    /// The state machine does not allow this transition
    #[error("queue item {item_id} cannot move from {from} to {to}")]
    InvalidTransition {
        item_id: String,
        from: QueueStatus,
        to: QueueStatus,
    },

    /// call-next on an organization with nobody waiting
    #[error("no one is waiting in the queue of organization {0}")]
    EmptyQueue(String),
}
