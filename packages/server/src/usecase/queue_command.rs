//! UseCase: 対応完了・スキップ・キャンセル・再受付

use std::sync::Arc;

use crate::domain::{
    EventPublisher, QueueItem, QueueItemId, QueueRepository, Timestamp, Transition,
    TransitionContext,
};

use super::{error::QueueCommandError, publish::publish_events};

/// 指定エントリへの状態遷移ユースケース
pub struct QueueCommandUseCase {
    repository: Arc<dyn QueueRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl QueueCommandUseCase {
    pub fn new(repository: Arc<dyn QueueRepository>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            repository,
            publisher,
        }
    }

    /// 状態遷移を実行
    ///
    /// # Returns
    ///
    /// * `Ok(QueueItem)` - 遷移後のエントリ
    /// * `Err(QueueCommandError)` - 対象なし、または許可されていない遷移
    pub async fn execute(
        &self,
        item_id: QueueItemId,
        transition: Transition,
        context: TransitionContext,
    ) -> Result<QueueItem, QueueCommandError> {
        let events = self
            .repository
            .transition(&item_id, transition, context, Timestamp::now())
            .await?;

        publish_events(self.publisher.as_ref(), &events).await;

        let item = events
            .into_iter()
            .map(|event| event.into_item())
            .find(|item| item.id == item_id)
            .ok_or_else(|| QueueCommandError::NotFound(item_id.to_string()))?;
        tracing::info!(
            organization_id = %item.organization_id,
            item_id = %item.id,
            status = %item.status,
            "Queue item updated"
        );
        Ok(item)
    }
}
