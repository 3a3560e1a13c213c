//! UseCase: 次の人を呼び出す

use std::sync::Arc;

use crate::domain::{
    EventPublisher, OrganizationId, QueueItem, QueueRepository, Timestamp, TransitionContext,
};

use super::{error::QueueCommandError, publish::publish_events};

/// 先頭の WAITING を呼び出すユースケース
pub struct CallNextUseCase {
    repository: Arc<dyn QueueRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl CallNextUseCase {
    pub fn new(repository: Arc<dyn QueueRepository>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            repository,
            publisher,
        }
    }

    /// 呼び出しを実行
    ///
    /// QUEUE_CALLED の後に、残りの WAITING 全員分の POSITION_UPDATE を配信する。
    pub async fn execute(
        &self,
        organization_id: OrganizationId,
        employee_id: Option<String>,
    ) -> Result<QueueItem, QueueCommandError> {
        let context = TransitionContext::new(employee_id, None);
        let events = self
            .repository
            .call_next(&organization_id, context, Timestamp::now())
            .await?;

        publish_events(self.publisher.as_ref(), &events).await;

        let item = events
            .into_iter()
            .next()
            .map(|event| event.into_item())
            .ok_or_else(|| QueueCommandError::EmptyQueue(organization_id.to_string()))?;
        tracing::info!(
            organization_id = %organization_id,
            item_id = %item.id,
            number = item.number,
            "Called next visitor"
        );
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventType, MockEventPublisher, MockQueueRepository, QueueError};

    #[tokio::test]
    async fn test_call_next_on_empty_queue_returns_error_without_publishing() {
        // テスト項目: 待ち人がいないと EmptyQueue を返し、何も配信しない
        // given (前提条件):
        let mut repository = MockQueueRepository::new();
        repository
            .expect_call_next()
            .times(1)
            .returning(|org, _, _| Err(QueueError::EmptyQueue(org.to_string())));
        let mut publisher = MockEventPublisher::new();
        publisher.expect_publish().never();
        let usecase = CallNextUseCase::new(Arc::new(repository), Arc::new(publisher));

        // when (操作):
        let result = usecase
            .execute(OrganizationId::new("org1".to_string()).unwrap(), None)
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(QueueCommandError::EmptyQueue(_))));
    }

    #[tokio::test]
    async fn test_call_next_publishes_called_then_position_updates() {
        // テスト項目: 3 人待ちで呼び出すと CALLED 1 件 + POSITION_UPDATE 2 件が順に配信される
        // given (前提条件):
        use crate::{
            domain::{NewQueueEntry, PhoneNumber, QueueItemId, ServiceId},
            infrastructure::repository::InMemoryQueueRepository,
        };
        let repository = Arc::new(InMemoryQueueRepository::default());
        let org = OrganizationId::new("org1".to_string()).unwrap();
        for n in 1..=3 {
            repository
                .join(
                    NewQueueEntry {
                        id: QueueItemId::new(format!("Q{n}")).unwrap(),
                        organization_id: org.clone(),
                        service_id: ServiceId::new("svc".to_string()).unwrap(),
                        user_phone: PhoneNumber::new(format!("+99890000000{n}")).unwrap(),
                    },
                    Timestamp::new(n),
                )
                .await
                .unwrap();
        }

        let mut publisher = MockEventPublisher::new();
        let mut seq = mockall::Sequence::new();
        publisher
            .expect_publish()
            .withf(|e| e.event_type() == EventType::QueueCalled && e.item().id.as_str() == "Q1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(1));
        publisher
            .expect_publish()
            .withf(|e| e.event_type() == EventType::PositionUpdate && e.item().position == Some(1))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(1));
        publisher
            .expect_publish()
            .withf(|e| e.event_type() == EventType::PositionUpdate && e.item().position == Some(2))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(1));
        let usecase = CallNextUseCase::new(repository, Arc::new(publisher));

        // when (操作):
        let item = usecase
            .execute(org, Some("emp1".to_string()))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(item.id.as_str(), "Q1");
        assert_eq!(item.logs.last().unwrap().actor_id.as_deref(), Some("emp1"));
    }
}
