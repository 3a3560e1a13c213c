use std::fmt;

/// Lifecycle of the client connection.
///
/// ```text
/// DISCONNECTED --connect--> CONNECTING --ok--> CONNECTED
/// CONNECTING --fail--> RECONNECTING --ok--> CONNECTED
/// CONNECTED --lost / idle--> RECONNECTING
/// any --unauthorized--> ERROR
/// any --disconnect--> DISCONNECTED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Error,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::Reconnecting => "RECONNECTING",
            Self::Error => "ERROR",
        }
    }

    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
