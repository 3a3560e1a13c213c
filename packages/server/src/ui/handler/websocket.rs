//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use navbat_shared::time::now_millis;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    domain::ConnectionIdFactory,
    infrastructure::{
        dto::websocket::{ClientMessage, ServerMessage},
        realtime::{ClientConnection, HeartbeatResult, Outbound, run_heartbeat},
    },
    ui::state::{AppState, ConnectQuery},
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    if !state.token_allowed(query.token.as_deref()) {
        tracing::warn!("Rejected WebSocket upgrade: invalid or missing token");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state)))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = match ConnectionIdFactory::generate() {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("Failed to generate connection id: {}", e);
            return;
        }
    };

    let (tx, mut rx) = mpsc::channel(state.config.send_buffer.max(1));
    let connection = Arc::new(ClientConnection::new(connection_id.clone(), tx));

    // queued before registration so no broadcast can overtake it
    send_message(
        &connection,
        &ServerMessage::ConnectionAck {
            connection_id: connection_id.to_string(),
            message: "Connected to queue updates".to_string(),
            timestamp: now_millis(),
        },
    );
    state.registry.add(connection.clone()).await;
    tracing::info!(conn_id = %connection_id, "Client connected");

    let (mut sender, mut receiver) = socket.split();

    // Drain the outbound queue into the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let message = match frame {
                Outbound::Text(text) => Message::Text(String::clone(&text).into()),
                Outbound::Ping => Message::Ping(Bytes::new()),
            };
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    // Handle client messages
    let reader = connection.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::debug!(conn_id = %reader.id, "WebSocket error: {}", e);
                    break;
                }
            };
            reader.mark_alive();

            match msg {
                Message::Text(text) => handle_client_text(&reader, text.as_str()),
                Message::Close(_) => {
                    tracing::info!(conn_id = %reader.id, "Client requested close");
                    break;
                }
                // Pong only refreshes liveness; Ping is answered by the protocol layer
                _ => {}
            }
        }
    });

    let cancel = CancellationToken::new();
    let mut heartbeat_task = tokio::spawn(run_heartbeat(
        connection.clone(),
        state.config.heartbeat_interval(),
        state.config.heartbeat_timeout(),
        cancel.clone(),
    ));
    let closed = connection.closed();

    tokio::select! {
        _ = &mut recv_task => {},
        _ = &mut send_task => {},
        result = &mut heartbeat_task => {
            if let Ok(HeartbeatResult::TimedOut) = result {
                tracing::warn!(conn_id = %connection_id, "Heartbeat timed out, closing connection");
            }
        },
        () = closed.cancelled() => {
            tracing::warn!(conn_id = %connection_id, "Connection closed by server");
        },
    };

    cancel.cancel();
    send_task.abort();
    recv_task.abort();
    heartbeat_task.abort();

    let _ = state.registry.remove(&connection_id).await;
    tracing::info!(
        conn_id = %connection_id,
        subscriptions = connection.subscriptions().len(),
        "Client disconnected and removed from registry"
    );
}

/// Apply one client message. Malformed input is logged and dropped.
fn handle_client_text(connection: &ClientConnection, text: &str) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Subscribe { org_id }) => {
            let added = connection.subscribe(org_id.clone());
            tracing::info!(conn_id = %connection.id, organization_id = %org_id, added, "Subscribed");
        }
        Ok(ClientMessage::Unsubscribe { org_id }) => {
            let removed = connection.unsubscribe(&org_id);
            tracing::info!(conn_id = %connection.id, organization_id = %org_id, removed, "Unsubscribed");
        }
        Ok(ClientMessage::Ping) => {
            send_message(
                connection,
                &ServerMessage::Pong {
                    timestamp: now_millis(),
                },
            );
        }
        Err(e) => {
            tracing::warn!(conn_id = %connection.id, "Dropping malformed client message: {}", e);
        }
    }
}

fn send_message(connection: &ClientConnection, message: &ServerMessage) -> bool {
    match serde_json::to_string(message) {
        Ok(json) => connection.send(Arc::new(json)),
        Err(e) => {
            tracing::warn!(conn_id = %connection.id, "Failed to serialize message: {}", e);
            false
        }
    }
}
