//! Router construction and server entry point.

use std::{future::Future, sync::Arc};

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::{
    config::ServerConfig,
    handler::{
        call_next, cancel_queue_item, get_queue_item, health_check, join_queue, my_queues,
        organization_history, organization_queue, requeue_queue_item, serve_queue_item,
        skip_queue_item, websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};
use crate::error::ServerError;

/// Build the axum router for the given state
pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/api/v1/health", get(health_check))
        .route("/api/v1/queues/join", post(join_queue))
        .route("/api/v1/queues/my", get(my_queues))
        .route("/api/v1/queues/{id}", get(get_queue_item))
        .route("/api/v1/queues/{id}/cancel", post(cancel_queue_item))
        .route("/api/v1/queues/{id}/serve", post(serve_queue_item))
        .route("/api/v1/queues/{id}/skip", post(skip_queue_item))
        .route("/api/v1/queues/{id}/requeue", post(requeue_queue_item))
        .route("/api/v1/organizations/{id}/queue", get(organization_queue))
        .route("/api/v1/organizations/{id}/history", get(organization_history))
        .route("/api/v1/organizations/{id}/queue/call-next", post(call_next))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already bound listener until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_app(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Bind the configured address and serve until Ctrl-C / SIGTERM
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let addr = config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    tracing::info!(
        addr = %addr,
        require_subscription = config.require_subscription,
        token_check = !config.access_tokens.is_empty(),
        "Queue server listening (WebSocket: ws://{}/ws)",
        addr
    );

    let state = Arc::new(AppState::new(config));
    serve(listener, state, shutdown_signal()).await?;

    tracing::info!("Server stopped");
    Ok(())
}
