//! WebSocket connection management.

mod backoff;
pub(crate) mod manager;
mod state;
mod transport;

pub use backoff::Backoff;
pub use manager::ConnectionManager;
pub use state::ConnectionState;
pub use transport::{Connector, Frame, Transport, TungsteniteConnector};
