//! Client error types.

use thiserror::Error;

/// Handshake failures reported by a [`Connector`](crate::connection::Connector)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// The server refused the token (HTTP 401/403). Not retried.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Network or protocol failure during the upgrade. Retried with backoff.
    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("handshake timed out")]
    Timeout,
}

impl ConnectError {
    /// Fatal errors move the manager to `ERROR` instead of retrying.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

/// Failures on an established transport
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("send failed: {0}")]
    Send(String),

    #[error("receive failed: {0}")]
    Receive(String),
}

/// Errors of the client facade and the REST collaborator
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server url: {0}")]
    InvalidUrl(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with `success: false`
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The connection manager task is gone
    #[error("connection manager stopped")]
    ManagerStopped,
}
