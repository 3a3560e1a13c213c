//! Handler modules for HTTP and WebSocket endpoints.

pub mod http;
pub mod websocket;

// Re-export HTTP handlers
pub use http::{
    call_next, cancel_queue_item, get_queue_item, health_check, join_queue, my_queues,
    organization_history, organization_queue, requeue_queue_item, serve_queue_item,
    skip_queue_item,
};

// Re-export WebSocket handlers
pub use websocket::websocket_handler;
