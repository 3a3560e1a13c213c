//! Transport seam between the connection manager and the network.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, Message, http::StatusCode},
};
use url::Url;

use crate::error::{ConnectError, TransportError};

/// What the manager sees of an inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A text message, expected to be JSON
    Text(String),
    /// Any other traffic (ping, pong, binary). Only proves liveness.
    Activity,
}

/// An established duplex connection.
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Next inbound frame. `None` once the peer closed the connection.
    async fn recv(&mut self) -> Option<Result<Frame, TransportError>>;

    async fn close(&mut self);
}

/// Opens transports. One call is one handshake attempt.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Transport>, ConnectError>;
}

/// [`Connector`] backed by tokio-tungstenite
#[derive(Debug, Clone)]
pub struct TungsteniteConnector {
    url: Url,
}

impl TungsteniteConnector {
    pub fn new(url: Url) -> Self {
        Self { url }
    }
}

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>, ConnectError> {
        match connect_async(self.url.as_str()).await {
            Ok((stream, _response)) => Ok(Box::new(WsTransport { stream })),
            Err(tungstenite::Error::Http(response))
                if matches!(
                    response.status(),
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
                ) =>
            {
                Err(ConnectError::Unauthorized(response.status().to_string()))
            }
            Err(e) => Err(ConnectError::Handshake(e.to_string())),
        }
    }
}

struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        match self.stream.next().await? {
            Ok(Message::Text(text)) => Some(Ok(Frame::Text(text.as_str().to_owned()))),
            Ok(Message::Close(_)) => None,
            Ok(_) => Some(Ok(Frame::Activity)),
            Err(tungstenite::Error::ConnectionClosed) => None,
            Err(e) => Some(Err(TransportError::Receive(e.to_string()))),
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!("Error while closing websocket: {}", e);
        }
    }
}
