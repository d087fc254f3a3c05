use std::sync::Arc;

use tracing::error;
use uuid::Uuid;

use schoolhub_db::Database;
use schoolhub_types::models::UserIdentity;

use crate::error::GatewayError;
use crate::registry::ConnectionRegistry;

/// Process-wide collaborators shared by every session: the store, the
/// connection registry and the credential secret.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

struct HubInner {
    db: Arc<Database>,
    registry: ConnectionRegistry,
    jwt_secret: String,
}

impl Hub {
    pub fn new(db: Arc<Database>, registry: ConnectionRegistry, jwt_secret: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(HubInner {
                db,
                registry,
                jwt_secret: jwt_secret.into(),
            }),
        }
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.inner.db
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.inner.registry
    }

    pub fn jwt_secret(&self) -> &str {
        &self.inner.jwt_secret
    }

    /// Run a blocking store call off the async runtime.
    pub(crate) async fn store<F, T>(&self, f: F) -> Result<T, GatewayError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.inner.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                GatewayError::StoreUnavailable
            })?
            .map_err(|e| {
                error!("Store call failed: {:#}", e);
                GatewayError::StoreUnavailable
            })
    }

    /// Identity lookup. `Ok(None)` means the user does not exist.
    pub async fn resolve_identity(&self, user_id: Uuid) -> Result<Option<UserIdentity>, GatewayError> {
        self.store(move |db| {
            db.get_user_by_id(&user_id.to_string())?
                .map(|row| row.identity())
                .transpose()
        })
        .await
    }

    pub async fn find_director(&self) -> Result<Option<UserIdentity>, GatewayError> {
        self.store(|db| db.find_director()?.map(|row| row.identity()).transpose())
            .await
    }
}
