//! Real-time queue client.
//!
//! Keeps one WebSocket connection to the queue server alive, shares it
//! between any number of channel consumers, and falls back to REST polling
//! while the socket is down.

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod feed;
pub mod poller;
pub mod rest;
pub mod subscription;
pub mod sync;

pub use client::QueueClient;
pub use config::{BackoffConfig, ClientConfig};
pub use connection::{ConnectionManager, ConnectionState};
pub use error::{ClientError, ConnectError, TransportError};
pub use feed::{QueueBoard, QueueFeed, QueueUpdate};
pub use poller::{FallbackPoller, SnapshotSource, SnapshotTarget};
pub use rest::{ItemAction, RestClient};
pub use subscription::{ChannelSubscription, SubscriptionRegistry};
pub use sync::QueueSync;
