//! Core domain models for the queue service.

use serde::{Deserialize, Serialize};

use super::{
    error::QueueError,
    event::QueueEvent,
    state_machine::{QueueStateMachine, QueueStatus, Transition},
    value_object::{OrganizationId, PhoneNumber, QueueItemId, ServiceId, Timestamp},
};

/// Default average minutes spent serving one visitor
pub const DEFAULT_SERVICE_MINUTES: u32 = 10;

/// One audit trail entry on a queue item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueLog {
    /// `JOINED`, `CALLED`, `SERVED`, `SKIPPED`, `CANCELLED` or `REQUEUED`
    pub action: String,
    /// Employee (or other actor) that performed the action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    /// Free-form reason or note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub timestamp: Timestamp,
}

/// A visitor's entry in an organization's queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: QueueItemId,
    pub organization_id: OrganizationId,
    pub service_id: ServiceId,
    pub user_phone: PhoneNumber,
    /// 1-based ticket number assigned at join
    pub number: u32,
    /// Current 1-based rank among WAITING entries, absent otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    pub status: QueueStatus,
    pub waiting_time_estimate_minutes: u32,
    pub joined_at: Timestamp,
    #[serde(default)]
    pub logs: Vec<QueueLog>,
}

/// Who performed a transition and why
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionContext {
    pub actor_id: Option<String>,
    pub reason: Option<String>,
}

impl TransitionContext {
    pub fn new(actor_id: Option<String>, reason: Option<String>) -> Self {
        Self { actor_id, reason }
    }
}

/// Queue aggregate of one organization.
///
/// Holds the active (WAITING and CALLED) entries in queue order plus the
/// archive of finished entries. Every mutation recomputes positions from a
/// single pass over the active entries, so WAITING positions are always the
/// contiguous sequence `1..=n`.
#[derive(Debug, Clone)]
pub struct OrganizationQueue {
    pub organization_id: OrganizationId,
    active: Vec<QueueItem>,
    history: Vec<QueueItem>,
    service_minutes: u32,
}

impl OrganizationQueue {
    /// Create an empty queue with the default service time
    pub fn new(organization_id: OrganizationId) -> Self {
        Self::with_service_minutes(organization_id, DEFAULT_SERVICE_MINUTES)
    }

    /// Create an empty queue with a custom average service time
    pub fn with_service_minutes(organization_id: OrganizationId, service_minutes: u32) -> Self {
        Self {
            organization_id,
            active: Vec::new(),
            history: Vec::new(),
            service_minutes,
        }
    }

    /// WAITING and CALLED entries in queue order
    pub fn active_items(&self) -> &[QueueItem] {
        &self.active
    }

    /// Archived entries, oldest first
    pub fn history(&self) -> &[QueueItem] {
        &self.history
    }

    pub fn waiting(&self) -> impl Iterator<Item = &QueueItem> {
        self.active
            .iter()
            .filter(|item| item.status == QueueStatus::Waiting)
    }

    /// Find an entry by id, active entries first
    pub fn find(&self, id: &QueueItemId) -> Option<&QueueItem> {
        self.active
            .iter()
            .chain(self.history.iter())
            .find(|item| &item.id == id)
    }

    /// The active entry held by this phone, if any
    pub fn active_for_phone(&self, phone: &PhoneNumber) -> Option<&QueueItem> {
        self.active.iter().find(|item| &item.user_phone == phone)
    }

    /// Add a visitor at the back of the WAITING line
    ///
    /// # Errors
    ///
    /// Returns `QueueError::AlreadyQueued` if the phone already holds an active entry
    pub fn join(
        &mut self,
        id: QueueItemId,
        service_id: ServiceId,
        user_phone: PhoneNumber,
        now: Timestamp,
    ) -> Result<Vec<QueueEvent>, QueueError> {
        if self.active_for_phone(&user_phone).is_some() {
            return Err(QueueError::AlreadyQueued {
                phone: user_phone.to_string(),
                organization_id: self.organization_id.to_string(),
            });
        }

        let position = self.waiting().count() as u32 + 1;
        let item = QueueItem {
            id,
            organization_id: self.organization_id.clone(),
            service_id,
            user_phone,
            number: position,
            position: Some(position),
            status: QueueStatus::Waiting,
            waiting_time_estimate_minutes: QueueStateMachine::estimate_minutes(
                position,
                self.service_minutes,
            ),
            joined_at: now,
            logs: vec![QueueLog {
                action: "JOINED".to_string(),
                actor_id: None,
                reason: None,
                timestamp: now,
            }],
        };
        self.active.push(item.clone());
        Ok(vec![QueueEvent::Joined(item)])
    }

    /// Call the first WAITING entry
    ///
    /// # Errors
    ///
    /// Returns `QueueError::EmptyQueue` if nobody is waiting
    pub fn call_next(
        &mut self,
        context: &TransitionContext,
        now: Timestamp,
    ) -> Result<Vec<QueueEvent>, QueueError> {
        let id = self
            .waiting()
            .next()
            .map(|item| item.id.clone())
            .ok_or_else(|| QueueError::EmptyQueue(self.organization_id.to_string()))?;
        self.apply(&id, Transition::Call, context, now)
    }

    /// Apply a transition to an active entry.
    ///
    /// Event order: the entry's own event first, then `PositionUpdated` for
    /// the WAITING entries whose rank moved. A call reports every remaining
    /// WAITING entry.
    ///
    /// # Errors
    ///
    /// * `QueueError::ItemNotFound` - no active entry with this id
    /// * `QueueError::InvalidTransition` - the state machine rejects the move
    pub fn apply(
        &mut self,
        id: &QueueItemId,
        transition: Transition,
        context: &TransitionContext,
        now: Timestamp,
    ) -> Result<Vec<QueueEvent>, QueueError> {
        let index = self
            .active
            .iter()
            .position(|item| &item.id == id)
            .ok_or_else(|| QueueError::ItemNotFound(id.to_string()))?;
        let from = self.active[index].status;
        let to = QueueStateMachine::next(from, transition).ok_or_else(|| {
            QueueError::InvalidTransition {
                item_id: id.to_string(),
                from,
                to: transition.target(),
            }
        })?;

        let mut item = self.active.remove(index);
        item.status = to;
        item.logs.push(QueueLog {
            action: transition.action().to_string(),
            actor_id: context.actor_id.clone(),
            reason: context.reason.clone(),
            timestamp: now,
        });

        if to.is_terminal() {
            item.position = None;
            item.waiting_time_estimate_minutes = 0;
            self.history.push(item.clone());
            let moved = self.recompute_positions();
            let mut events = vec![terminal_event(transition, item)];
            events.extend(moved.into_iter().map(QueueEvent::PositionUpdated));
            return Ok(events);
        }

        match transition {
            Transition::Requeue => {
                self.active.push(item);
                let moved = self.recompute_positions();
                Ok(moved.into_iter().map(QueueEvent::PositionUpdated).collect())
            }
            _ => {
                self.active.insert(index, item);
                self.recompute_positions();
                let mut events = vec![QueueEvent::Called(self.active[index].clone())];
                events.extend(self.waiting().cloned().map(QueueEvent::PositionUpdated));
                Ok(events)
            }
        }
    }

    pub fn call(
        &mut self,
        id: &QueueItemId,
        context: &TransitionContext,
        now: Timestamp,
    ) -> Result<Vec<QueueEvent>, QueueError> {
        self.apply(id, Transition::Call, context, now)
    }

    pub fn serve(
        &mut self,
        id: &QueueItemId,
        context: &TransitionContext,
        now: Timestamp,
    ) -> Result<Vec<QueueEvent>, QueueError> {
        self.apply(id, Transition::Serve, context, now)
    }

    pub fn skip(
        &mut self,
        id: &QueueItemId,
        context: &TransitionContext,
        now: Timestamp,
    ) -> Result<Vec<QueueEvent>, QueueError> {
        self.apply(id, Transition::Skip, context, now)
    }

    pub fn cancel(
        &mut self,
        id: &QueueItemId,
        context: &TransitionContext,
        now: Timestamp,
    ) -> Result<Vec<QueueEvent>, QueueError> {
        self.apply(id, Transition::Cancel, context, now)
    }

    pub fn requeue(
        &mut self,
        id: &QueueItemId,
        context: &TransitionContext,
        now: Timestamp,
    ) -> Result<Vec<QueueEvent>, QueueError> {
        self.apply(id, Transition::Requeue, context, now)
    }

    /// Reassign `1..=n` to WAITING entries in queue order and clear the
    /// position of everything else. Returns the WAITING entries whose
    /// position changed.
    fn recompute_positions(&mut self) -> Vec<QueueItem> {
        let service_minutes = self.service_minutes;
        let mut rank = 0;
        let mut moved = Vec::new();

        for item in &mut self.active {
            let position = if item.status == QueueStatus::Waiting {
                rank += 1;
                Some(rank)
            } else {
                None
            };
            let changed = item.position != position;
            item.position = position;
            item.waiting_time_estimate_minutes = position
                .map(|p| QueueStateMachine::estimate_minutes(p, service_minutes))
                .unwrap_or(0);
            if changed && position.is_some() {
                moved.push(item.clone());
            }
        }
        moved
    }
}

fn terminal_event(transition: Transition, item: QueueItem) -> QueueEvent {
    match transition {
        Transition::Serve => QueueEvent::Served(item),
        Transition::Skip => QueueEvent::Skipped(item),
        _ => QueueEvent::Cancelled(item),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::EventType;
    use proptest::prelude::*;

    fn org() -> OrganizationId {
        OrganizationId::new("org1".to_string()).unwrap()
    }

    fn item_id(n: usize) -> QueueItemId {
        QueueItemId::new(format!("Q{n}")).unwrap()
    }

    fn phone(n: usize) -> PhoneNumber {
        PhoneNumber::new(format!("+9989000000{n:02}")).unwrap()
    }

    fn service() -> ServiceId {
        ServiceId::new("svc".to_string()).unwrap()
    }

    fn queue_with(n: usize) -> OrganizationQueue {
        let mut queue = OrganizationQueue::new(org());
        for i in 1..=n {
            queue
                .join(item_id(i), service(), phone(i), Timestamp::new(i as i64))
                .unwrap();
        }
        queue
    }

    fn waiting_positions(queue: &OrganizationQueue) -> Vec<u32> {
        queue.waiting().filter_map(|item| item.position).collect()
    }

    #[test]
    fn test_join_assigns_number_and_position() {
        // テスト項目: 3 人目の参加者は number=3, position=3 となる
        // given (前提条件):
        let mut queue = queue_with(2);

        // when (操作):
        let events = queue
            .join(item_id(3), service(), phone(3), Timestamp::new(3))
            .unwrap();

        // then (期待する結果):
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), EventType::QueueJoined);
        let item = events[0].item();
        assert_eq!(item.number, 3);
        assert_eq!(item.position, Some(3));
        assert_eq!(item.waiting_time_estimate_minutes, 20);
        assert_eq!(item.logs[0].action, "JOINED");
    }

    #[test]
    fn test_join_rejects_phone_already_active() {
        // テスト項目: 同じ電話番号で 2 回参加するとエラー
        // given (前提条件):
        let mut queue = queue_with(1);

        // when (操作):
        let result = queue.join(item_id(9), service(), phone(1), Timestamp::new(9));

        // then (期待する結果):
        assert!(matches!(result, Err(QueueError::AlreadyQueued { .. })));
        assert_eq!(queue.active_items().len(), 1);
    }

    #[test]
    fn test_join_rejects_phone_while_called() {
        // テスト項目: 呼び出し中 (CALLED) の電話番号も再参加できない
        let mut queue = queue_with(1);
        queue
            .call_next(&TransitionContext::default(), Timestamp::new(5))
            .unwrap();

        let result = queue.join(item_id(9), service(), phone(1), Timestamp::new(9));

        assert!(matches!(result, Err(QueueError::AlreadyQueued { .. })));
    }

    #[test]
    fn test_join_allowed_again_after_served() {
        // テスト項目: 対応完了後は同じ電話番号で再参加できる
        let mut queue = queue_with(1);
        let ctx = TransitionContext::default();
        queue.call(&item_id(1), &ctx, Timestamp::new(5)).unwrap();
        queue.serve(&item_id(1), &ctx, Timestamp::new(6)).unwrap();

        let result = queue.join(item_id(2), service(), phone(1), Timestamp::new(7));

        assert!(result.is_ok());
    }

    #[test]
    fn test_call_next_emits_called_then_position_updates() {
        // テスト項目: 先頭を呼ぶと QUEUE_CALLED の後に残り全員分の POSITION_UPDATE が出る
        // given (前提条件):
        let mut queue = queue_with(3);

        // when (操作):
        let events = queue
            .call_next(
                &TransitionContext::new(Some("emp1".to_string()), None),
                Timestamp::new(10),
            )
            .unwrap();

        // then (期待する結果):
        let types: Vec<EventType> = events.iter().map(|e| e.event_type()).collect();
        assert_eq!(
            types,
            vec![
                EventType::QueueCalled,
                EventType::PositionUpdate,
                EventType::PositionUpdate
            ]
        );
        assert_eq!(events[0].item().id, item_id(1));
        assert_eq!(events[0].item().status, QueueStatus::Called);
        assert_eq!(events[0].item().position, None);
        assert_eq!(events[0].item().logs[1].actor_id.as_deref(), Some("emp1"));
        assert_eq!(events[1].item().id, item_id(2));
        assert_eq!(events[1].item().position, Some(1));
        assert_eq!(events[1].item().waiting_time_estimate_minutes, 0);
        assert_eq!(events[2].item().id, item_id(3));
        assert_eq!(events[2].item().position, Some(2));
    }

    #[test]
    fn test_call_next_on_empty_queue_fails() {
        // テスト項目: 待ち人がいない状態で call-next するとエラー
        let mut queue = queue_with(1);
        let ctx = TransitionContext::default();
        queue.call_next(&ctx, Timestamp::new(2)).unwrap();

        let result = queue.call_next(&ctx, Timestamp::new(3));

        assert_eq!(result, Err(QueueError::EmptyQueue("org1".to_string())));
    }

    #[test]
    fn test_cancel_waiting_updates_only_entries_behind() {
        // テスト項目: 2 番目をキャンセルすると 3 番目以降だけ POSITION_UPDATE が出る
        // given (前提条件):
        let mut queue = queue_with(4);

        // when (操作):
        let events = queue
            .cancel(
                &item_id(2),
                &TransitionContext::new(None, Some("changed plans".to_string())),
                Timestamp::new(10),
            )
            .unwrap();

        // then (期待する結果):
        assert_eq!(events[0].event_type(), EventType::QueueCancelled);
        assert_eq!(events[0].item().position, None);
        assert_eq!(
            events[0].item().logs.last().unwrap().reason.as_deref(),
            Some("changed plans")
        );
        let updated: Vec<(QueueItemId, Option<u32>)> = events[1..]
            .iter()
            .map(|e| (e.item().id.clone(), e.item().position))
            .collect();
        assert_eq!(
            updated,
            vec![(item_id(3), Some(2)), (item_id(4), Some(3))]
        );
        assert_eq!(queue.history().len(), 1);
        assert_eq!(waiting_positions(&queue), vec![1, 2, 3]);
    }

    #[test]
    fn test_cancel_called_entry_is_rejected() {
        // テスト項目: CALLED のエントリはキャンセルできない
        let mut queue = queue_with(1);
        let ctx = TransitionContext::default();
        queue.call_next(&ctx, Timestamp::new(2)).unwrap();

        let result = queue.cancel(&item_id(1), &ctx, Timestamp::new(3));

        assert_eq!(
            result,
            Err(QueueError::InvalidTransition {
                item_id: "Q1".to_string(),
                from: QueueStatus::Called,
                to: QueueStatus::Cancelled,
            })
        );
    }

    #[test]
    fn test_serve_and_skip_archive_without_position_updates() {
        // テスト項目: CALLED の対応完了・スキップは WAITING の順位に影響しない
        // given (前提条件):
        let mut queue = queue_with(3);
        let ctx = TransitionContext::default();
        queue.call(&item_id(1), &ctx, Timestamp::new(4)).unwrap();
        queue.call(&item_id(2), &ctx, Timestamp::new(5)).unwrap();

        // when (操作):
        let served = queue.serve(&item_id(1), &ctx, Timestamp::new(6)).unwrap();
        let skipped = queue.skip(&item_id(2), &ctx, Timestamp::new(7)).unwrap();

        // then (期待する結果):
        assert_eq!(served.len(), 1);
        assert_eq!(served[0].event_type(), EventType::QueueServed);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].event_type(), EventType::QueueSkipped);
        assert_eq!(queue.history().len(), 2);
        assert_eq!(queue.active_items().len(), 1);
        assert_eq!(waiting_positions(&queue), vec![1]);
    }

    #[test]
    fn test_requeue_moves_called_entry_to_back() {
        // テスト項目: 再受付 (requeue) で CALLED のエントリが列の最後尾に戻る
        // given (前提条件):
        let mut queue = queue_with(3);
        let ctx = TransitionContext::default();
        queue.call_next(&ctx, Timestamp::new(4)).unwrap();

        // when (操作):
        let events = queue.requeue(&item_id(1), &ctx, Timestamp::new(5)).unwrap();

        // then (期待する結果):
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), EventType::PositionUpdate);
        assert_eq!(events[0].item().id, item_id(1));
        assert_eq!(events[0].item().status, QueueStatus::Waiting);
        assert_eq!(events[0].item().position, Some(3));
        let order: Vec<QueueItemId> = queue.waiting().map(|i| i.id.clone()).collect();
        assert_eq!(order, vec![item_id(2), item_id(3), item_id(1)]);
    }

    #[test]
    fn test_unknown_item_is_not_found() {
        // テスト項目: 存在しない ID への操作は ItemNotFound
        let mut queue = queue_with(1);

        let result = queue.serve(&item_id(42), &TransitionContext::default(), Timestamp::new(1));

        assert_eq!(result, Err(QueueError::ItemNotFound("Q42".to_string())));
    }

    #[test]
    fn test_archived_item_is_still_findable() {
        // テスト項目: 履歴に移動したエントリも find で取得できる
        let mut queue = queue_with(1);
        let ctx = TransitionContext::default();
        queue.cancel(&item_id(1), &ctx, Timestamp::new(2)).unwrap();

        let found = queue.find(&item_id(1)).unwrap();

        assert_eq!(found.status, QueueStatus::Cancelled);
        assert!(queue.active_for_phone(&phone(1)).is_none());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Join,
        CallNext,
        Call(usize),
        Serve(usize),
        Skip(usize),
        Cancel(usize),
        Requeue(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => Just(Op::Join),
            1 => Just(Op::CallNext),
            1 => (0..20usize).prop_map(Op::Call),
            1 => (0..20usize).prop_map(Op::Serve),
            1 => (0..20usize).prop_map(Op::Skip),
            1 => (0..20usize).prop_map(Op::Cancel),
            1 => (0..20usize).prop_map(Op::Requeue),
        ]
    }

    proptest! {
        #[test]
        fn prop_waiting_positions_stay_contiguous(ops in proptest::collection::vec(op_strategy(), 1..60)) {
            // テスト項目: どの操作列の後でも WAITING の順位は 1..=n の連番
            let mut queue = OrganizationQueue::new(org());
            let ctx = TransitionContext::default();
            let mut joined = 0usize;

            for (step, op) in ops.into_iter().enumerate() {
                let now = Timestamp::new(step as i64);
                let _ = match op {
                    Op::Join => {
                        joined += 1;
                        queue.join(item_id(joined), service(), phone(joined % 100), now)
                    }
                    Op::CallNext => queue.call_next(&ctx, now),
                    Op::Call(n) => queue.call(&item_id(n), &ctx, now),
                    Op::Serve(n) => queue.serve(&item_id(n), &ctx, now),
                    Op::Skip(n) => queue.skip(&item_id(n), &ctx, now),
                    Op::Cancel(n) => queue.cancel(&item_id(n), &ctx, now),
                    Op::Requeue(n) => queue.requeue(&item_id(n), &ctx, now),
                };

                let positions = waiting_positions(&queue);
                let expected: Vec<u32> = (1..=queue.waiting().count() as u32).collect();
                prop_assert_eq!(positions, expected);
                for item in queue.active_items().iter().filter(|i| i.status != QueueStatus::Waiting) {
                    prop_assert_eq!(item.position, None);
                }
            }
        }
    }
}
