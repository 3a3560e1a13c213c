//! REST client for the queue API.

use async_trait::async_trait;
use navbat_server::{
    domain::{OrganizationId, PhoneNumber, QueueItem, QueueItemId},
    infrastructure::dto::http::{ApiResponse, JoinQueueRequest, QueueActionRequest},
};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    error::ClientError,
    poller::{SnapshotSource, SnapshotTarget},
};

/// Actions on a single queue item (`POST /api/v1/queues/{id}/{action}`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemAction {
    Cancel,
    Serve,
    Skip,
    Requeue,
}

impl ItemAction {
    fn path(self) -> &'static str {
        match self {
            Self::Cancel => "cancel",
            Self::Serve => "serve",
            Self::Skip => "skip",
            Self::Requeue => "requeue",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base: String,
}

impl RestClient {
    pub fn new(server_url: &str) -> Result<Self, ClientError> {
        let url = Url::parse(server_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl(format!(
                "unsupported scheme: {}",
                url.scheme()
            )));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base: url.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base, path)
    }

    pub async fn join(
        &self,
        organization_id: &OrganizationId,
        service_id: &str,
        phone: &PhoneNumber,
    ) -> Result<QueueItem, ClientError> {
        let body = JoinQueueRequest {
            organization_id: organization_id.to_string(),
            service_id: service_id.to_string(),
            user_phone: phone.to_string(),
        };
        let response = self
            .http
            .post(self.endpoint("/queues/join"))
            .json(&body)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn my_queues(&self, phone: &PhoneNumber) -> Result<Vec<QueueItem>, ClientError> {
        let response = self
            .http
            .get(self.endpoint("/queues/my"))
            .query(&[("phone", phone.as_str())])
            .send()
            .await?;
        decode(response).await
    }

    pub async fn queue_item(&self, id: &QueueItemId) -> Result<QueueItem, ClientError> {
        let response = self
            .http
            .get(self.endpoint(&format!("/queues/{id}")))
            .send()
            .await?;
        decode(response).await
    }

    /// Live queue (WAITING and CALLED) of an organization
    pub async fn organization_queue(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<QueueItem>, ClientError> {
        let response = self
            .http
            .get(self.endpoint(&format!("/organizations/{organization_id}/queue")))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn organization_history(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<QueueItem>, ClientError> {
        let response = self
            .http
            .get(self.endpoint(&format!("/organizations/{organization_id}/history")))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn call_next(
        &self,
        organization_id: &OrganizationId,
        request: &QueueActionRequest,
    ) -> Result<QueueItem, ClientError> {
        let response = self
            .http
            .post(self.endpoint(&format!(
                "/organizations/{organization_id}/queue/call-next"
            )))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn item_action(
        &self,
        id: &QueueItemId,
        action: ItemAction,
        request: &QueueActionRequest,
    ) -> Result<QueueItem, ClientError> {
        let response = self
            .http
            .post(self.endpoint(&format!("/queues/{id}/{}", action.path())))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }
}

#[async_trait]
impl SnapshotSource for RestClient {
    async fn fetch(&self, target: &SnapshotTarget) -> Result<Vec<QueueItem>, ClientError> {
        match target {
            SnapshotTarget::Phone(phone) => self.my_queues(phone).await,
            SnapshotTarget::Organization(organization_id) => {
                self.organization_queue(organization_id).await
            }
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    let body: ApiResponse<T> = response.json().await?;
    open_envelope(status, body)
}

fn open_envelope<T>(status: StatusCode, body: ApiResponse<T>) -> Result<T, ClientError> {
    match (body.success, body.data) {
        (true, Some(data)) => Ok(data),
        (true, None) => Err(ClientError::Api {
            status: status.as_u16(),
            message: "response carried no data".to_string(),
        }),
        (false, _) => Err(ClientError::Api {
            status: status.as_u16(),
            message: body.error.unwrap_or_else(|| status.to_string()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navbat_server::domain::{OrganizationQueue, ServiceId, Timestamp};

    fn envelope<T: DeserializeOwned>(json: &str) -> ApiResponse<T> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_success_envelope_yields_data() {
        // テスト項目: 成功レスポンスの data が取り出せる
        // given (前提条件): サーバーが返す形式の JSON
        let item = OrganizationQueue::new(OrganizationId::new("orgA".to_string()).unwrap())
            .join(
                QueueItemId::new("Q1".to_string()).unwrap(),
                ServiceId::new("svc".to_string()).unwrap(),
                PhoneNumber::new("+998901234567".to_string()).unwrap(),
                Timestamp::new(1_000),
            )
            .unwrap()
            .remove(0)
            .into_item();
        let json = serde_json::to_string(&ApiResponse::ok(vec![item.clone()])).unwrap();

        // when (操作):
        let items: Vec<QueueItem> = open_envelope(StatusCode::OK, envelope(&json)).unwrap();

        // then (期待する結果):
        assert_eq!(items, vec![item]);
    }

    #[test]
    fn test_error_envelope_without_data_field() {
        // テスト項目: data フィールドのないエラーレスポンスはステータスとメッセージを返す
        let json = r#"{"success":false,"error":"Queue item not found","timestamp":"2026-01-01T00:00:00Z"}"#;

        let result = open_envelope::<QueueItem>(StatusCode::NOT_FOUND, envelope(json));

        match result {
            Err(ClientError::Api { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "Queue item not found");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn test_success_without_data_is_an_error() {
        // テスト項目: success=true でも data がなければエラーになる
        let json = r#"{"success":true,"timestamp":"2026-01-01T00:00:00Z"}"#;

        let result = open_envelope::<Vec<QueueItem>>(StatusCode::OK, envelope(json));

        assert!(matches!(result, Err(ClientError::Api { status: 200, .. })));
    }
}
