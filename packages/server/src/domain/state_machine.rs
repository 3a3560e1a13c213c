//! Queue item lifecycle.
//!
//! ```text
//! WAITING --call--> CALLED --serve--> SERVED
//!    |                 |--skip---> SKIPPED
//!    |                 `--requeue--> WAITING
//!    `--cancel--> CANCELLED
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a queue item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStatus {
    Waiting,
    Called,
    Served,
    Skipped,
    Cancelled,
}

impl QueueStatus {
    /// SERVED, SKIPPED and CANCELLED end the lifecycle; the item is archived.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Served | Self::Skipped | Self::Cancelled)
    }

    /// WAITING and CALLED entries count towards the one-active-entry-per-phone rule.
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "WAITING",
            Self::Called => "CALLED",
            Self::Served => "SERVED",
            Self::Skipped => "SKIPPED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operation that moves a queue item between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Call,
    Serve,
    Skip,
    Cancel,
    Requeue,
}

impl Transition {
    /// Status the item ends up in.
    pub fn target(self) -> QueueStatus {
        match self {
            Self::Call => QueueStatus::Called,
            Self::Serve => QueueStatus::Served,
            Self::Skip => QueueStatus::Skipped,
            Self::Cancel => QueueStatus::Cancelled,
            Self::Requeue => QueueStatus::Waiting,
        }
    }

    /// Action name recorded in the item's audit log.
    pub fn action(self) -> &'static str {
        match self {
            Self::Call => "CALLED",
            Self::Serve => "SERVED",
            Self::Skip => "SKIPPED",
            Self::Cancel => "CANCELLED",
            Self::Requeue => "REQUEUED",
        }
    }
}

/// Pure transition table. No I/O, no clock.
pub struct QueueStateMachine;

impl QueueStateMachine {
    /// Returns the next status, or `None` when the transition is not allowed
    /// from `from`.
    pub fn next(from: QueueStatus, transition: Transition) -> Option<QueueStatus> {
        use QueueStatus::*;
        use Transition::*;

        match (from, transition) {
            (Waiting, Call) | (Waiting, Cancel) => Some(transition.target()),
            (Called, Serve) | (Called, Skip) | (Called, Requeue) => Some(transition.target()),
            _ => None,
        }
    }

    pub fn can_apply(from: QueueStatus, transition: Transition) -> bool {
        Self::next(from, transition).is_some()
    }

    /// Waiting time estimate for a 1-based position.
    pub fn estimate_minutes(position: u32, service_minutes: u32) -> u32 {
        position.saturating_sub(1).saturating_mul(service_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [QueueStatus; 5] = [
        QueueStatus::Waiting,
        QueueStatus::Called,
        QueueStatus::Served,
        QueueStatus::Skipped,
        QueueStatus::Cancelled,
    ];

    const ALL_TRANSITIONS: [Transition; 5] = [
        Transition::Call,
        Transition::Serve,
        Transition::Skip,
        Transition::Cancel,
        Transition::Requeue,
    ];

    #[test]
    fn test_allowed_transitions() {
        // テスト項目: 許可された遷移のみ次の状態を返す
        assert_eq!(
            QueueStateMachine::next(QueueStatus::Waiting, Transition::Call),
            Some(QueueStatus::Called)
        );
        assert_eq!(
            QueueStateMachine::next(QueueStatus::Waiting, Transition::Cancel),
            Some(QueueStatus::Cancelled)
        );
        assert_eq!(
            QueueStateMachine::next(QueueStatus::Called, Transition::Serve),
            Some(QueueStatus::Served)
        );
        assert_eq!(
            QueueStateMachine::next(QueueStatus::Called, Transition::Skip),
            Some(QueueStatus::Skipped)
        );
        assert_eq!(
            QueueStateMachine::next(QueueStatus::Called, Transition::Requeue),
            Some(QueueStatus::Waiting)
        );
    }

    #[test]
    fn test_terminal_states_reject_every_transition() {
        // テスト項目: 終端状態からはどの遷移も許可されない
        for status in ALL_STATUSES.iter().filter(|s| s.is_terminal()) {
            for transition in ALL_TRANSITIONS {
                assert!(
                    !QueueStateMachine::can_apply(*status, transition),
                    "{status} should reject {transition:?}"
                );
            }
        }
    }

    #[test]
    fn test_rejected_transitions_from_active_states() {
        // テスト項目: WAITING から serve/skip/requeue、CALLED から call/cancel は不可
        // then (期待する結果):
        assert!(!QueueStateMachine::can_apply(QueueStatus::Waiting, Transition::Serve));
        assert!(!QueueStateMachine::can_apply(QueueStatus::Waiting, Transition::Skip));
        assert!(!QueueStateMachine::can_apply(QueueStatus::Waiting, Transition::Requeue));
        assert!(!QueueStateMachine::can_apply(QueueStatus::Called, Transition::Call));
        assert!(!QueueStateMachine::can_apply(QueueStatus::Called, Transition::Cancel));
    }

    #[test]
    fn test_status_serializes_in_screaming_case() {
        // テスト項目: ステータスは大文字スネークケースでシリアライズされる
        assert_eq!(
            serde_json::to_string(&QueueStatus::Cancelled).unwrap(),
            r#""CANCELLED""#
        );
        let parsed: QueueStatus = serde_json::from_str(r#""CALLED""#).unwrap();
        assert_eq!(parsed, QueueStatus::Called);
    }

    #[test]
    fn test_estimate_minutes() {
        // テスト項目: 先頭は待ち時間 0、以降は前にいる人数 × 平均対応時間
        assert_eq!(QueueStateMachine::estimate_minutes(1, 10), 0);
        assert_eq!(QueueStateMachine::estimate_minutes(3, 10), 20);
        assert_eq!(QueueStateMachine::estimate_minutes(0, 10), 0);
    }
}
