//! UseCase 層
//!
//! ビジネスロジックを実装するレイヤー。
//! UI 層から呼び出され、Domain 層を操作します。
//! 状態変更で発生したイベントは EventPublisher ポート経由で配信します。

pub mod call_next;
pub mod error;
pub mod join_queue;
pub mod list_queue;
pub mod publish;
pub mod queue_command;

pub use call_next::CallNextUseCase;
pub use error::{JoinQueueError, QueueCommandError};
pub use join_queue::JoinQueueUseCase;
pub use list_queue::ListQueueUseCase;
pub use publish::publish_events;
pub use queue_command::QueueCommandUseCase;
