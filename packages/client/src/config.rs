//! Client configuration.

use std::time::Duration;

use url::Url;

use crate::error::ClientError;

/// Reconnection backoff: `initial * multiplier^attempt`, capped at `max`,
/// then spread by `±jitter` (a ratio, `0.2` = ±20%) and capped again.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    pub initial: Duration,
    pub multiplier: f64,
    pub max: Duration,
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            multiplier: 2.0,
            max: Duration::from_secs(30),
            jitter: 0.2,
        }
    }
}

/// Settings of a client session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base HTTP URL of the server, e.g. `http://127.0.0.1:8080`
    pub server_url: String,
    /// Token passed as `?token=` on the WebSocket upgrade
    pub token: Option<String>,
    pub backoff: BackoffConfig,
    /// Upper bound for one WebSocket handshake
    pub connect_timeout: Duration,
    /// Reconnect when nothing arrives for this long
    pub idle_timeout: Duration,
    /// Interval of application `PING`s while connected
    pub heartbeat_interval: Duration,
    /// Fallback polling interval while not connected
    pub poll_interval: Duration,
    /// Capacity of the event and update broadcast channels
    pub event_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".to_string(),
            token: None,
            backoff: BackoffConfig::default(),
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(60),
            heartbeat_interval: Duration::from_secs(25),
            poll_interval: Duration::from_secs(5),
            event_buffer: 256,
        }
    }
}

impl ClientConfig {
    /// `ws(s)://host/ws?token=...` derived from `server_url`
    pub fn ws_url(&self) -> Result<Url, ClientError> {
        let mut url =
            Url::parse(&self.server_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(ClientError::InvalidUrl(format!("unsupported scheme: {other}"))),
        };
        url.set_scheme(scheme)
            .map_err(|()| ClientError::InvalidUrl(self.server_url.clone()))?;
        url.set_path("/ws");
        url.set_query(None);
        if let Some(token) = &self.token {
            url.query_pairs_mut().append_pair("token", token);
        }
        Ok(url)
    }
}
