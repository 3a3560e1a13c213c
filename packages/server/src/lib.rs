//! Real-time queue server library.
//!
//! Organizations own ordered waiting lists; every change to a list is
//! published over WebSocket to the clients watching that organization.

pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// Re-export entry points
pub use ui::{ServerConfig, build_app, run as run_server, serve};
