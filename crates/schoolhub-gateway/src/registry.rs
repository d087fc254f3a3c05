use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use schoolhub_types::events::GatewayEvent;
use schoolhub_types::models::{Role, UserIdentity};

pub type ConnectionId = Uuid;

/// Per-connection outbound queue, drained by the socket writer.
pub type Outbox = mpsc::UnboundedSender<GatewayEvent>;

/// Identity bound to an authenticated connection.
#[derive(Debug, Clone)]
pub struct BoundConnection {
    pub user_id: Uuid,
    pub role: Role,
    pub display_name: String,
    outbox: Outbox,
}

/// Live authenticated connections, indexed both by connection and by user.
/// Created once per process and shared by every session.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

#[derive(Default)]
struct RegistryInner {
    connections: HashMap<ConnectionId, BoundConnection>,

    /// user_id -> every live connection of that user (multi-tab)
    by_user: HashMap<Uuid, HashSet<ConnectionId>>,
}

impl RegistryInner {
    fn remove(&mut self, conn_id: ConnectionId) -> Option<BoundConnection> {
        let bound = self.connections.remove(&conn_id)?;
        if let Some(conns) = self.by_user.get_mut(&bound.user_id) {
            conns.remove(&conn_id);
            if conns.is_empty() {
                self.by_user.remove(&bound.user_id);
            }
        }
        Some(bound)
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `identity` to a connection and make it reachable under the user's
    /// id. A connection holds at most one identity; rebinding replaces it.
    pub async fn bind(&self, conn_id: ConnectionId, identity: &UserIdentity, outbox: Outbox) {
        let mut inner = self.inner.write().await;
        inner.remove(conn_id);
        inner.connections.insert(
            conn_id,
            BoundConnection {
                user_id: identity.id,
                role: identity.role,
                display_name: identity.display_name(),
                outbox,
            },
        );
        inner.by_user.entry(identity.id).or_default().insert(conn_id);
    }

    /// Forget a connection. The user's other connections are untouched.
    pub async fn unbind(&self, conn_id: ConnectionId) -> Option<BoundConnection> {
        self.inner.write().await.remove(conn_id)
    }

    /// Push an event to every live connection of `user_id`.
    /// Returns how many connections accepted it.
    pub async fn send_to_user(&self, user_id: Uuid, event: GatewayEvent) -> usize {
        let inner = self.inner.read().await;
        let Some(conns) = inner.by_user.get(&user_id) else {
            return 0;
        };

        conns
            .iter()
            .filter_map(|conn_id| inner.connections.get(conn_id))
            .filter(|bound| bound.outbox.send(event.clone()).is_ok())
            .count()
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.inner.read().await.by_user.contains_key(&user_id)
    }

    pub async fn connection_count(&self, user_id: Uuid) -> usize {
        self.inner
            .read()
            .await
            .by_user
            .get(&user_id)
            .map_or(0, HashSet::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(role: Role) -> UserIdentity {
        UserIdentity {
            id: Uuid::new_v4(),
            first_name: "Test".into(),
            last_name: "User".into(),
            role,
        }
    }

    fn event() -> GatewayEvent {
        GatewayEvent::MessageRead {
            message_id: Uuid::nil(),
        }
    }

    #[tokio::test]
    async fn fans_out_to_every_connection_of_a_user() {
        let registry = ConnectionRegistry::new();
        let user = identity(Role::Director);

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        registry.bind(Uuid::new_v4(), &user, tx1).await;
        registry.bind(Uuid::new_v4(), &user, tx2).await;

        assert_eq!(registry.send_to_user(user.id, event()).await, 2);
        assert_eq!(rx1.try_recv().unwrap(), event());
        assert_eq!(rx2.try_recv().unwrap(), event());
    }

    #[tokio::test]
    async fn unbind_only_removes_that_connection() {
        let registry = ConnectionRegistry::new();
        let user = identity(Role::Student);
        let (first, second) = (Uuid::new_v4(), Uuid::new_v4());

        let (tx, _rx) = mpsc::unbounded_channel();
        registry.bind(first, &user, tx.clone()).await;
        registry.bind(second, &user, tx).await;

        assert!(registry.unbind(first).await.is_some());
        assert!(registry.is_online(user.id).await);
        assert_eq!(registry.connection_count(user.id).await, 1);

        registry.unbind(second).await;
        assert!(!registry.is_online(user.id).await);
        assert!(registry.unbind(second).await.is_none());
    }

    #[tokio::test]
    async fn rebinding_a_connection_moves_it_to_the_new_user() {
        let registry = ConnectionRegistry::new();
        let (alice, bob) = (identity(Role::Student), identity(Role::Student));
        let conn = Uuid::new_v4();

        let (tx, _rx) = mpsc::unbounded_channel();
        registry.bind(conn, &alice, tx.clone()).await;
        registry.bind(conn, &bob, tx).await;

        assert!(!registry.is_online(alice.id).await);
        assert!(registry.is_online(bob.id).await);
        assert_eq!(registry.unbind(conn).await.unwrap().user_id, bob.id);
    }

    #[tokio::test]
    async fn sending_to_an_offline_user_reaches_nobody() {
        let registry = ConnectionRegistry::new();
        assert_eq!(registry.send_to_user(Uuid::new_v4(), event()).await, 0);
        assert_eq!(registry.connection_count(Uuid::new_v4()).await, 0);
    }
}
