//! HTTP + WebSocket server (UI layer).

pub mod config;
mod handler;
mod runner;
mod signal;
pub mod state; // UseCase 層からアクセスするため public

pub use config::ServerConfig;
pub use runner::{build_app, run, serve};
pub use signal::shutdown_signal;
