//! ドメインイベントの配信（ベストエフォート）

use crate::domain::{EventPublisher, QueueEvent};

/// イベントを発生順に配信する
///
/// 配信の失敗はログに記録するだけで、状態変更は取り消さない。
pub async fn publish_events(publisher: &dyn EventPublisher, events: &[QueueEvent]) {
    for event in events {
        match publisher.publish(event).await {
            Ok(delivered) => tracing::debug!(
                event_type = %event.event_type(),
                organization_id = %event.organization_id(),
                item_id = %event.item().id,
                delivered,
                "Event published"
            ),
            Err(e) => tracing::warn!(
                event_type = %event.event_type(),
                organization_id = %event.organization_id(),
                "Failed to publish event: {}",
                e
            ),
        }
    }
}
