//! UseCase: キュー参加処理
//!
//! ### 何をテストしているか
//! - JoinQueueUseCase::execute() メソッド
//! - 参加時の採番・重複チェック・QUEUE_JOINED の配信
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規参加とイベント配信
//! - 異常系：同じ電話番号での二重参加
//! - エッジケース：配信に失敗しても参加は成立する

use std::sync::Arc;

use crate::domain::{
    EventPublisher, NewQueueEntry, OrganizationId, PhoneNumber, QueueItem, QueueItemIdFactory,
    QueueRepository, ServiceId, Timestamp,
};

use super::{error::JoinQueueError, publish::publish_events};

/// キュー参加のユースケース
pub struct JoinQueueUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn QueueRepository>,
    /// イベント配信ポート
    publisher: Arc<dyn EventPublisher>,
}

impl JoinQueueUseCase {
    /// 新しい JoinQueueUseCase を作成
    pub fn new(repository: Arc<dyn QueueRepository>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            repository,
            publisher,
        }
    }

    /// キュー参加を実行
    ///
    /// # Returns
    ///
    /// * `Ok(QueueItem)` - 作成されたエントリ
    /// * `Err(JoinQueueError)` - 参加失敗
    pub async fn execute(
        &self,
        organization_id: OrganizationId,
        service_id: ServiceId,
        user_phone: PhoneNumber,
    ) -> Result<QueueItem, JoinQueueError> {
        // 1. ID の採番
        let id = QueueItemIdFactory::generate()
            .map_err(|e| JoinQueueError::IdGeneration(e.to_string()))?;

        // 2. 集約に追加（重複チェックは集約が行う）
        let entry = NewQueueEntry {
            id,
            organization_id,
            service_id,
            user_phone,
        };
        let entry_id = entry.id.to_string();
        let events = self.repository.join(entry, Timestamp::now()).await?;

        // 3. 配信（失敗しても参加は取り消さない）
        publish_events(self.publisher.as_ref(), &events).await;

        let item = events
            .into_iter()
            .next()
            .map(|event| event.into_item())
            .ok_or(JoinQueueError::MissingJoinEvent(entry_id))?;
        tracing::info!(
            organization_id = %item.organization_id,
            item_id = %item.id,
            number = item.number,
            "Visitor joined the queue"
        );
        Ok(item)
    }
}
