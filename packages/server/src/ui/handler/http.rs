//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    domain::{
        OrganizationId, PhoneNumber, QueueItem, QueueItemId, ServiceId, Transition,
        TransitionContext, ValueObjectError,
    },
    infrastructure::dto::http::{
        ApiResponse, HealthDto, JoinQueueRequest, PhoneQuery, QueueActionRequest,
    },
    ui::state::AppState,
    usecase::{
        CallNextUseCase, JoinQueueError, JoinQueueUseCase, ListQueueUseCase, QueueCommandError,
        QueueCommandUseCase,
    },
};

/// Error response rendered as the standard envelope
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::error(self.message))).into_response()
    }
}

impl From<ValueObjectError> for ApiError {
    fn from(err: ValueObjectError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, err.to_string())
    }
}

impl From<JoinQueueError> for ApiError {
    fn from(err: JoinQueueError) -> Self {
        let status = match err {
            JoinQueueError::AlreadyQueued(_) => StatusCode::CONFLICT,
            JoinQueueError::IdGeneration(_) | JoinQueueError::MissingJoinEvent(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.to_string())
    }
}

impl From<QueueCommandError> for ApiError {
    fn from(err: QueueCommandError) -> Self {
        let status = match err {
            QueueCommandError::NotFound(_) | QueueCommandError::EmptyQueue(_) => {
                StatusCode::NOT_FOUND
            }
            QueueCommandError::InvalidTransition(_) => StatusCode::CONFLICT,
        };
        Self::new(status, err.to_string())
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Action endpoints accept an empty body
fn parse_action(body: &Bytes) -> Result<QueueActionRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(QueueActionRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, format!("invalid body: {e}")))
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthDto>> {
    Json(ApiResponse::ok(HealthDto {
        status: "ok".to_string(),
        connections: state.registry.len().await,
    }))
}

/// Join a queue
pub async fn join_queue(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JoinQueueRequest>,
) -> Result<(StatusCode, Json<ApiResponse<QueueItem>>), ApiError> {
    let organization_id = OrganizationId::new(request.organization_id)?;
    let service_id = ServiceId::new(request.service_id)?;
    let user_phone = PhoneNumber::new(request.user_phone)?;

    let usecase = JoinQueueUseCase::new(state.repository.clone(), state.publisher());
    let item = usecase
        .execute(organization_id, service_id, user_phone)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message(item, "Joined the queue")),
    ))
}

/// Active entries held by a phone
pub async fn my_queues(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PhoneQuery>,
) -> ApiResult<Vec<QueueItem>> {
    let phone = PhoneNumber::new(query.phone)?;
    let usecase = ListQueueUseCase::new(state.repository.clone());
    Ok(Json(ApiResponse::ok(usecase.for_phone(&phone).await)))
}

/// Single entry, active or archived
pub async fn get_queue_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<QueueItem> {
    let item_id = QueueItemId::new(id)?;
    let usecase = ListQueueUseCase::new(state.repository.clone());
    match usecase.find(&item_id).await {
        Some(item) => Ok(Json(ApiResponse::ok(item))),
        None => Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("queue item not found: {item_id}"),
        )),
    }
}

async fn run_transition(
    state: Arc<AppState>,
    id: String,
    transition: Transition,
    context: TransitionContext,
    message: &str,
) -> ApiResult<QueueItem> {
    let item_id = QueueItemId::new(id)?;
    let usecase = QueueCommandUseCase::new(state.repository.clone(), state.publisher());
    let item = usecase.execute(item_id, transition, context).await?;
    Ok(Json(ApiResponse::ok_with_message(item, message)))
}

/// Cancel a WAITING entry
pub async fn cancel_queue_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<QueueItem> {
    let request = parse_action(&body)?;
    let context = TransitionContext::new(request.employee_id, request.reason);
    run_transition(state, id, Transition::Cancel, context, "Queue entry cancelled").await
}

/// Mark a CALLED entry as served
pub async fn serve_queue_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<QueueItem> {
    let request = parse_action(&body)?;
    let context = TransitionContext::new(request.employee_id, request.notes.or(request.reason));
    run_transition(state, id, Transition::Serve, context, "Visitor served").await
}

/// Mark a CALLED entry as skipped (no-show)
pub async fn skip_queue_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<QueueItem> {
    let request = parse_action(&body)?;
    let context = TransitionContext::new(request.employee_id, request.reason);
    run_transition(state, id, Transition::Skip, context, "Visitor skipped").await
}

/// Put a CALLED entry back at the end of the line
pub async fn requeue_queue_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<QueueItem> {
    let request = parse_action(&body)?;
    let context = TransitionContext::new(request.employee_id, request.reason);
    run_transition(state, id, Transition::Requeue, context, "Visitor requeued").await
}

/// Live (WAITING + CALLED) entries of an organization
pub async fn organization_queue(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Vec<QueueItem>> {
    let organization_id = OrganizationId::new(id)?;
    let usecase = ListQueueUseCase::new(state.repository.clone());
    Ok(Json(ApiResponse::ok(usecase.live(&organization_id).await)))
}

/// Archived entries of an organization
pub async fn organization_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Vec<QueueItem>> {
    let organization_id = OrganizationId::new(id)?;
    let usecase = ListQueueUseCase::new(state.repository.clone());
    Ok(Json(ApiResponse::ok(usecase.history(&organization_id).await)))
}

/// Call the next WAITING visitor
pub async fn call_next(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<QueueItem> {
    let organization_id = OrganizationId::new(id)?;
    let request = parse_action(&body)?;
    let usecase = CallNextUseCase::new(state.repository.clone(), state.publisher());
    let item = usecase.execute(organization_id, request.employee_id).await?;
    Ok(Json(ApiResponse::ok_with_message(item, "Next visitor called")))
}
