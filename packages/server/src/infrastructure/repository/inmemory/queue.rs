//! InMemory Queue Repository 実装
//!
//! ドメイン層が定義する QueueRepository trait の具体的な実装。
//! 組織ごとの `OrganizationQueue` 集約を HashMap に保持します。
//!
//! 全組織の集約と ID 索引を 1 つの Mutex で保護するため、参加・遷移・
//! 順位の再計算は常に 1 つのスナップショットに対して行われます。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    DEFAULT_SERVICE_MINUTES, NewQueueEntry, OrganizationId, OrganizationQueue, PhoneNumber,
    QueueError, QueueEvent, QueueItem, QueueItemId, QueueRepository, Timestamp, Transition,
    TransitionContext,
};

#[derive(Default)]
struct Store {
    queues: HashMap<OrganizationId, OrganizationQueue>,
    /// item id -> organization
    index: HashMap<QueueItemId, OrganizationId>,
}

/// インメモリ Queue Repository 実装
pub struct InMemoryQueueRepository {
    store: Arc<Mutex<Store>>,
    /// 待ち時間見積もりに使う 1 人あたりの平均対応時間（分）
    service_minutes: u32,
}

impl InMemoryQueueRepository {
    /// 新しい InMemoryQueueRepository を作成
    pub fn new(service_minutes: u32) -> Self {
        Self {
            store: Arc::new(Mutex::new(Store::default())),
            service_minutes,
        }
    }
}

impl Default for InMemoryQueueRepository {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_MINUTES)
    }
}

#[async_trait]
impl QueueRepository for InMemoryQueueRepository {
    async fn join(
        &self,
        entry: NewQueueEntry,
        now: Timestamp,
    ) -> Result<Vec<QueueEvent>, QueueError> {
        let mut store = self.store.lock().await;
        let service_minutes = self.service_minutes;
        let queue = store
            .queues
            .entry(entry.organization_id.clone())
            .or_insert_with(|| {
                OrganizationQueue::with_service_minutes(
                    entry.organization_id.clone(),
                    service_minutes,
                )
            });

        let events = queue.join(entry.id.clone(), entry.service_id, entry.user_phone, now)?;
        store.index.insert(entry.id, entry.organization_id);
        Ok(events)
    }

    async fn call_next(
        &self,
        organization_id: &OrganizationId,
        context: TransitionContext,
        now: Timestamp,
    ) -> Result<Vec<QueueEvent>, QueueError> {
        let mut store = self.store.lock().await;
        match store.queues.get_mut(organization_id) {
            Some(queue) => queue.call_next(&context, now),
            None => Err(QueueError::EmptyQueue(organization_id.to_string())),
        }
    }

    async fn transition(
        &self,
        item_id: &QueueItemId,
        transition: Transition,
        context: TransitionContext,
        now: Timestamp,
    ) -> Result<Vec<QueueEvent>, QueueError> {
        let mut store = self.store.lock().await;
        let organization_id = store
            .index
            .get(item_id)
            .cloned()
            .ok_or_else(|| QueueError::ItemNotFound(item_id.to_string()))?;
        let queue = store
            .queues
            .get_mut(&organization_id)
            .ok_or_else(|| QueueError::ItemNotFound(item_id.to_string()))?;
        queue.apply(item_id, transition, &context, now)
    }

    async fn find(&self, item_id: &QueueItemId) -> Option<QueueItem> {
        let store = self.store.lock().await;
        let organization_id = store.index.get(item_id)?;
        store
            .queues
            .get(organization_id)
            .and_then(|queue| queue.find(item_id))
            .cloned()
    }

    async fn active_for_phone(&self, phone: &PhoneNumber) -> Vec<QueueItem> {
        let store = self.store.lock().await;
        let mut items: Vec<QueueItem> = store
            .queues
            .values()
            .filter_map(|queue| queue.active_for_phone(phone))
            .cloned()
            .collect();
        items.sort_by_key(|item| item.joined_at);
        items
    }

    async fn live_for_organization(&self, organization_id: &OrganizationId) -> Vec<QueueItem> {
        let store = self.store.lock().await;
        store
            .queues
            .get(organization_id)
            .map(|queue| queue.active_items().to_vec())
            .unwrap_or_default()
    }

    async fn history_for_organization(&self, organization_id: &OrganizationId) -> Vec<QueueItem> {
        let store = self.store.lock().await;
        store
            .queues
            .get(organization_id)
            .map(|queue| queue.history().to_vec())
            .unwrap_or_default()
    }
}
