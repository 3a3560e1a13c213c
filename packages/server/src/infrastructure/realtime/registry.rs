//! Live connections of this server process.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::connection::ClientConnection;
use crate::domain::{ConnectionId, OrganizationId};

/// Registry of connected clients indexed by connection ID.
///
/// The lock is only held to insert, remove or copy out the member list;
/// nothing is written to a socket while it is held.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Arc<ClientConnection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, connection: Arc<ClientConnection>) {
        let mut conns = self.connections.write().await;
        let _ = conns.insert(connection.id.clone(), connection);
    }

    pub async fn remove(&self, connection_id: &ConnectionId) -> Option<Arc<ClientConnection>> {
        self.connections.write().await.remove(connection_id)
    }

    pub async fn get(&self, connection_id: &ConnectionId) -> Option<Arc<ClientConnection>> {
        self.connections.read().await.get(connection_id).cloned()
    }

    /// Copy of the current member list.
    pub async fn snapshot(&self) -> Vec<Arc<ClientConnection>> {
        self.connections.read().await.values().cloned().collect()
    }

    /// Returns `false` if the connection is unknown or already subscribed.
    pub async fn subscribe(&self, connection_id: &ConnectionId, channel: OrganizationId) -> bool {
        match self.get(connection_id).await {
            Some(conn) => conn.subscribe(channel),
            None => false,
        }
    }

    /// Returns `false` if the connection is unknown or was not subscribed.
    pub async fn unsubscribe(&self, connection_id: &ConnectionId, channel: &OrganizationId) -> bool {
        match self.get(connection_id).await {
            Some(conn) => conn.unsubscribe(channel),
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConnectionIdFactory;
    use tokio::sync::mpsc;

    fn make_connection() -> Arc<ClientConnection> {
        let (tx, _rx) = mpsc::channel(8);
        Arc::new(ClientConnection::new(ConnectionIdFactory::generate().unwrap(), tx))
    }

    #[tokio::test]
    async fn test_add_and_remove() {
        // テスト項目: 接続の登録と削除
        // given (前提条件):
        let registry = ConnectionRegistry::new();
        let conn = make_connection();

        // when (操作):
        registry.add(conn.clone()).await;

        // then (期待する結果):
        assert_eq!(registry.len().await, 1);
        assert!(registry.remove(&conn.id).await.is_some());
        assert!(registry.is_empty().await);
        assert!(registry.remove(&conn.id).await.is_none());
    }

    #[tokio::test]
    async fn test_subscribe_through_registry() {
        // テスト項目: Registry 経由で購読を変更できる。未登録の接続は false
        let registry = ConnectionRegistry::new();
        let conn = make_connection();
        registry.add(conn.clone()).await;
        let org = OrganizationId::new("orgA".to_string()).unwrap();

        assert!(registry.subscribe(&conn.id, org.clone()).await);
        assert_eq!(conn.subscriptions(), vec![org.clone()]);
        assert!(registry.unsubscribe(&conn.id, &org).await);

        let stranger = ConnectionIdFactory::generate().unwrap();
        assert!(!registry.subscribe(&stranger, org).await);
    }

    #[tokio::test]
    async fn test_snapshot_is_detached_from_registry() {
        // テスト項目: スナップショット取得後の削除はスナップショットに影響しない
        let registry = ConnectionRegistry::new();
        let conn = make_connection();
        registry.add(conn.clone()).await;

        let snapshot = registry.snapshot().await;
        registry.remove(&conn.id).await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.len().await, 0);
    }
}
