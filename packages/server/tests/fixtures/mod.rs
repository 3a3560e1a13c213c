//! Shared test fixtures: an in-process server on an ephemeral port and a
//! small WebSocket client.

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use navbat_server::{ServerConfig, ui::state::AppState};
use serde_json::{Value, json};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::oneshot,
    task::JoinHandle,
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(ServerConfig::default()).await
    }

    pub async fn start_with(config: ServerConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local addr");
        let state = Arc::new(AppState::new(config));
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = navbat_server::serve(listener, state, shutdown).await {
                eprintln!("test server error: {e}");
            }
        });

        Self {
            addr,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub async fn join(&self, organization_id: &str, phone: &str) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("{}/api/v1/queues/join", self.base_url()))
            .json(&json!({
                "organizationId": organization_id,
                "serviceId": "svc1",
                "userPhone": phone,
            }))
            .send()
            .await
            .expect("Failed to send join request")
    }

    pub async fn post(&self, path: &str) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("{}{}", self.base_url(), path))
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn get_json(&self, path: &str) -> Value {
        reqwest::get(format!("{}{}", self.base_url(), path))
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    /// Connect and consume the CONNECTION_ACK
    pub async fn connect(url: &str) -> (Self, Value) {
        let (stream, _) = connect_async(url).await.expect("Failed to connect");
        let mut client = Self { stream };
        let ack = client.next_json().await;
        (client, ack)
    }

    pub async fn send_json(&mut self, value: Value) {
        self.stream
            .send(Message::Text(value.to_string().into()))
            .await
            .expect("Failed to send message");
    }

    /// Next text message as JSON, skipping control frames
    pub async fn next_json(&mut self) -> Value {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), self.stream.next())
                .await
                .expect("Timed out waiting for message")
                .expect("Stream ended")
                .expect("WebSocket error");
            if let Message::Text(text) = msg {
                return serde_json::from_str(text.as_str()).expect("Invalid JSON");
            }
        }
    }

    /// Round-trip a PING so every earlier message has been processed
    pub async fn sync(&mut self) {
        self.send_json(json!({"type": "PING"})).await;
        let pong = self.next_json().await;
        assert_eq!(pong["type"], "PONG", "expected PONG, got {pong}");
    }

    pub async fn subscribe(&mut self, organization_id: &str) {
        self.send_json(json!({"type": "SUBSCRIBE", "orgId": organization_id}))
            .await;
        self.sync().await;
    }
}
