//! Real-time queue server.
//!
//! Serves the queue REST API and pushes queue events to WebSocket clients.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin navbat-server -- --port 8080
//! ```

use clap::Parser;
use navbat_server::ServerConfig;
use navbat_shared::logger::setup_logger;

#[tokio::main]
async fn main() {
    let config = ServerConfig::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    // Run the server
    if let Err(e) = navbat_server::run_server(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
