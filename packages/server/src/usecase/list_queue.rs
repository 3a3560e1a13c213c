//! UseCase: キューの参照（スナップショット取得）

use std::sync::Arc;

use crate::domain::{OrganizationId, PhoneNumber, QueueItem, QueueItemId, QueueRepository};

/// 参照系のユースケース
///
/// FallbackPoller などが REST 経由で取得するスナップショットを返す。
pub struct ListQueueUseCase {
    repository: Arc<dyn QueueRepository>,
}

impl ListQueueUseCase {
    pub fn new(repository: Arc<dyn QueueRepository>) -> Self {
        Self { repository }
    }

    /// 電話番号が保持しているアクティブなエントリ
    pub async fn for_phone(&self, phone: &PhoneNumber) -> Vec<QueueItem> {
        self.repository.active_for_phone(phone).await
    }

    /// 組織の WAITING + CALLED エントリ
    pub async fn live(&self, organization_id: &OrganizationId) -> Vec<QueueItem> {
        self.repository.live_for_organization(organization_id).await
    }

    /// 組織の履歴
    pub async fn history(&self, organization_id: &OrganizationId) -> Vec<QueueItem> {
        self.repository.history_for_organization(organization_id).await
    }

    pub async fn find(&self, item_id: &QueueItemId) -> Option<QueueItem> {
        self.repository.find(item_id).await
    }
}
