//! Domain factories for creating identifiers.

use super::{ConnectionId, QueueItemId, error::ValueObjectError};

/// Factory for generating QueueItemId instances.
///
/// Ids are `Q` followed by a simple (hyphenless) UUID v4.
pub struct QueueItemIdFactory;

impl QueueItemIdFactory {
    /// Generate a new QueueItemId.
    ///
    /// # Errors
    ///
    /// This method should not fail in practice, but returns Result for consistency
    /// with the domain error handling pattern.
    pub fn generate() -> Result<QueueItemId, ValueObjectError> {
        let uuid = uuid::Uuid::new_v4();
        QueueItemId::new(format!("Q{}", uuid.simple()))
    }
}

/// Factory for generating ConnectionId instances (UUID v4).
pub struct ConnectionIdFactory;

impl ConnectionIdFactory {
    /// Generate a new ConnectionId.
    pub fn generate() -> Result<ConnectionId, ValueObjectError> {
        ConnectionId::new(uuid::Uuid::new_v4().to_string())
    }
}
