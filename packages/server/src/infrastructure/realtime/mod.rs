//! Real-time delivery: connection registry, broadcaster and heartbeat.

pub mod broadcaster;
pub mod connection;
pub mod heartbeat;
pub mod registry;

pub use broadcaster::Broadcaster;
pub use connection::{ClientConnection, Outbound};
pub use heartbeat::{HeartbeatResult, run_heartbeat};
pub use registry::ConnectionRegistry;
