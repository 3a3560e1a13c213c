//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::QueueError;

/// 参加処理のエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JoinQueueError {
    /// 同じ電話番号のアクティブなエントリが既に存在する
    #[error("{0}")]
    AlreadyQueued(String),

    /// ID の採番に失敗した
    #[error("failed to generate queue item id: {0}")]
    IdGeneration(String),

    /// リポジトリが参加イベントを返さなかった
    #[error("join of {0} produced no QUEUE_JOINED event")]
    MissingJoinEvent(String),
}

impl From<QueueError> for JoinQueueError {
    fn from(err: QueueError) -> Self {
        Self::AlreadyQueued(err.to_string())
    }
}

/// 呼び出し・対応完了・スキップ・キャンセル・再受付のエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueCommandError {
    /// 対象のエントリが存在しない
    #[error("{0}")]
    NotFound(String),

    /// 状態遷移が許可されていない
    #[error("{0}")]
    InvalidTransition(String),

    /// 待っている人がいない
    #[error("{0}")]
    EmptyQueue(String),
}

impl From<QueueError> for QueueCommandError {
    fn from(err: QueueError) -> Self {
        let message = err.to_string();
        match err {
            QueueError::ItemNotFound(_) => Self::NotFound(message),
            QueueError::InvalidTransition { .. } | QueueError::AlreadyQueued { .. } => {
                Self::InvalidTransition(message)
            }
            QueueError::EmptyQueue(_) => Self::EmptyQueue(message),
        }
    }
}
