//! Server configuration (command line flags with `NAVBAT_*` environment fallbacks).

use std::time::Duration;

use clap::Parser;

use crate::domain::DEFAULT_SERVICE_MINUTES;

/// Real-time queue server
#[derive(Debug, Clone, Parser)]
#[command(name = "navbat-server", version, about)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "NAVBAT_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "NAVBAT_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Accepted WebSocket tokens (comma separated). Empty accepts any token.
    #[arg(long, env = "NAVBAT_ACCESS_TOKENS", value_delimiter = ',')]
    pub access_tokens: Vec<String>,

    /// Seconds between WebSocket pings
    #[arg(
        long,
        env = "NAVBAT_HEARTBEAT_INTERVAL",
        value_parser = clap::value_parser!(u64).range(1..),
        default_value_t = 30,
    )]
    pub heartbeat_interval_secs: u64,

    /// Seconds without a pong before a connection is closed
    #[arg(long, env = "NAVBAT_HEARTBEAT_TIMEOUT", default_value_t = 60)]
    pub heartbeat_timeout_secs: u64,

    /// Per-connection outbound queue length
    #[arg(long, env = "NAVBAT_SEND_BUFFER", default_value_t = 64)]
    pub send_buffer: usize,

    /// Deliver events only to connections that subscribed to the organization
    #[arg(long, env = "NAVBAT_REQUIRE_SUBSCRIPTION")]
    pub require_subscription: bool,

    /// Average minutes spent per visitor, used for waiting time estimates
    #[arg(long, env = "NAVBAT_SERVICE_MINUTES", default_value_t = DEFAULT_SERVICE_MINUTES)]
    pub service_minutes: u32,
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            access_tokens: Vec::new(),
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 60,
            send_buffer: 64,
            require_subscription: false,
            service_minutes: DEFAULT_SERVICE_MINUTES,
        }
    }
}
