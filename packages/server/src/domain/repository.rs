//! Repository trait（ドメイン層が定義するデータアクセスの抽象）
//!
//! UseCase 層はこの trait に依存し、具体的な実装（InMemory など）には依存しません。

use async_trait::async_trait;

use super::{
    entity::{QueueItem, TransitionContext},
    error::QueueError,
    event::QueueEvent,
    state_machine::Transition,
    value_object::{OrganizationId, PhoneNumber, QueueItemId, ServiceId, Timestamp},
};

/// 新規参加リクエスト（ID は UseCase 層で採番済み）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQueueEntry {
    pub id: QueueItemId,
    pub organization_id: OrganizationId,
    pub service_id: ServiceId,
    pub user_phone: PhoneNumber,
}

/// キューの永続化を抽象化する Repository
///
/// 各メソッドは組織ごとの集約（`OrganizationQueue`）を 1 つのロックの下で
/// 変更し、発生したドメインイベントを返します。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueueRepository: Send + Sync {
    /// 列の最後尾に参加する
    async fn join(&self, entry: NewQueueEntry, now: Timestamp)
    -> Result<Vec<QueueEvent>, QueueError>;

    /// 先頭の WAITING を呼び出す
    async fn call_next(
        &self,
        organization_id: &OrganizationId,
        context: TransitionContext,
        now: Timestamp,
    ) -> Result<Vec<QueueEvent>, QueueError>;

    /// 指定エントリに状態遷移を適用する
    async fn transition(
        &self,
        item_id: &QueueItemId,
        transition: Transition,
        context: TransitionContext,
        now: Timestamp,
    ) -> Result<Vec<QueueEvent>, QueueError>;

    /// ID でエントリを取得する（履歴を含む）
    async fn find(&self, item_id: &QueueItemId) -> Option<QueueItem>;

    /// 電話番号が保持しているアクティブなエントリ（全組織）
    async fn active_for_phone(&self, phone: &PhoneNumber) -> Vec<QueueItem>;

    /// 組織の WAITING + CALLED エントリ（列の順）
    async fn live_for_organization(&self, organization_id: &OrganizationId) -> Vec<QueueItem>;

    /// 組織の履歴（終了したエントリ）
    async fn history_for_organization(&self, organization_id: &OrganizationId) -> Vec<QueueItem>;
}
