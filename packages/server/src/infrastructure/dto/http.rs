//! HTTP API request / response DTOs for the queue service.

use serde::{Deserialize, Serialize};

/// Response envelope shared by every REST endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String, // ISO 8601
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
            timestamp: now_rfc3339(),
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(error.into()),
            timestamp: now_rfc3339(),
        }
    }
}

fn now_rfc3339() -> String {
    navbat_shared::time::millis_to_rfc3339(navbat_shared::time::now_millis())
}

/// Body of `POST /api/v1/queues/join`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinQueueRequest {
    pub organization_id: String,
    pub service_id: String,
    pub user_phone: String,
}

/// Optional body of the queue action endpoints (cancel, serve, skip, requeue, call-next)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueActionRequest {
    pub employee_id: Option<String>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

/// Query of `GET /api/v1/queues/my`
#[derive(Debug, Clone, Deserialize)]
pub struct PhoneQuery {
    pub phone: String,
}

/// Body of `GET /api/v1/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDto {
    pub status: String,
    pub connections: usize,
}
