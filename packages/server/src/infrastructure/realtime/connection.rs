//! Server-side state of one WebSocket client.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::{ConnectionId, OrganizationId};

/// Frames queued for a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Serialized JSON text message, shared between recipients
    Text(Arc<String>),
    /// Protocol-level WebSocket ping
    Ping,
}

/// Represents a connected WebSocket client.
pub struct ClientConnection {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Organizations this client asked for. Empty means "no filter".
    subscriptions: Mutex<HashSet<OrganizationId>>,
    /// Bounded queue drained by the writer task.
    tx: mpsc::Sender<Outbound>,
    /// Cancelled when the server decides to drop this client.
    closed: CancellationToken,
    is_alive: AtomicBool,
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Outbound>) -> Self {
        Self {
            id,
            subscriptions: Mutex::new(HashSet::new()),
            tx,
            closed: CancellationToken::new(),
            is_alive: AtomicBool::new(true),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Add a channel. Returns `false` if it was already present.
    pub fn subscribe(&self, channel: OrganizationId) -> bool {
        self.subscriptions.lock().insert(channel)
    }

    /// Remove a channel. Returns `false` if it was not present.
    pub fn unsubscribe(&self, channel: &OrganizationId) -> bool {
        self.subscriptions.lock().remove(channel)
    }

    pub fn subscriptions(&self) -> Vec<OrganizationId> {
        let mut channels: Vec<_> = self.subscriptions.lock().iter().cloned().collect();
        channels.sort();
        channels
    }

    /// Whether an event on `channel` should be delivered here.
    ///
    /// A connection with no subscriptions receives everything unless
    /// `require_subscription` is set.
    pub fn accepts(&self, channel: &OrganizationId, require_subscription: bool) -> bool {
        let subscriptions = self.subscriptions.lock();
        if subscriptions.is_empty() {
            !require_subscription
        } else {
            subscriptions.contains(channel)
        }
    }

    /// Queue a text message without waiting.
    ///
    /// Returns `false` if the queue is full or the writer is gone, and
    /// increments the dropped message counter.
    pub fn send(&self, message: Arc<String>) -> bool {
        self.enqueue(Outbound::Text(message))
    }

    pub fn send_ping(&self) -> bool {
        self.enqueue(Outbound::Ping)
    }

    fn enqueue(&self, frame: Outbound) -> bool {
        if self.tx.try_send(frame).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Ask the handler to tear the socket down.
    pub fn close(&self) {
        self.closed.cancel();
    }

    /// Resolves once `close` has been called.
    pub fn closed(&self) -> CancellationToken {
        self.closed.clone()
    }

    /// Record inbound activity (pong or any frame).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
    }

    /// Check and reset the alive flag for heartbeat.
    ///
    /// Returns `true` if the connection was alive since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConnectionIdFactory;

    fn org(id: &str) -> OrganizationId {
        OrganizationId::new(id.to_string()).unwrap()
    }

    fn make_connection(capacity: usize) -> (ClientConnection, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity);
        let conn = ClientConnection::new(ConnectionIdFactory::generate().unwrap(), tx);
        (conn, rx)
    }

    #[test]
    fn test_empty_subscription_set_accepts_everything_by_default() {
        // テスト項目: 購読なしの接続は全組織のイベントを受け取る（require_subscription=false）
        let (conn, _rx) = make_connection(4);

        assert!(conn.accepts(&org("orgA"), false));
        assert!(conn.accepts(&org("orgZ"), false));
        assert!(!conn.accepts(&org("orgA"), true));
    }

    #[test]
    fn test_subscribed_connection_filters_other_channels() {
        // テスト項目: 購読中の接続は購読した組織のイベントだけを受け取る
        // given (前提条件):
        let (conn, _rx) = make_connection(4);

        // when (操作):
        assert!(conn.subscribe(org("orgA")));
        assert!(!conn.subscribe(org("orgA")));

        // then (期待する結果):
        assert!(conn.accepts(&org("orgA"), false));
        assert!(!conn.accepts(&org("orgB"), false));
        assert_eq!(conn.subscriptions(), vec![org("orgA")]);

        assert!(conn.unsubscribe(&org("orgA")));
        assert!(conn.accepts(&org("orgB"), false));
    }

    #[tokio::test]
    async fn test_send_to_full_queue_fails_fast() {
        // テスト項目: 送信キューが満杯なら待たずに false を返す
        let (conn, mut rx) = make_connection(1);

        assert!(conn.send(Arc::new("msg1".into())));
        assert!(!conn.send(Arc::new("msg2".into())));
        assert_eq!(conn.drop_count(), 1);
        assert_eq!(rx.recv().await, Some(Outbound::Text(Arc::new("msg1".into()))));
    }

    #[test]
    fn test_send_to_closed_writer_fails() {
        // テスト項目: 書き込みタスクが終了していれば false を返す
        let (conn, rx) = make_connection(4);
        drop(rx);

        assert!(!conn.send(Arc::new("hello".into())));
        assert!(!conn.send_ping());
    }

    #[test]
    fn test_check_alive_resets_flag() {
        // テスト項目: check_alive は生存フラグを読み取ってリセットする
        let (conn, _rx) = make_connection(4);

        assert!(conn.check_alive());
        assert!(!conn.check_alive());
        conn.mark_alive();
        assert!(conn.check_alive());
    }
}
