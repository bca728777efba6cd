use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::store::CredentialStore;
use crate::directory::model::{DirectoryEntry, UserQuery};
use crate::error::ClientError;
use crate::http::{bearer_token, ApiClient};

/// Abstraction over the backend's user listing.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// List users matching `query`.
    ///
    /// Fails with `Unauthenticated`, `Forbidden` or `Network`.
    async fn list_users(&self, query: &UserQuery) -> Result<Vec<DirectoryEntry>, ClientError>;
}

/// `UserDirectory` backed by `GET /users`.
pub struct HttpUserDirectory {
    api: ApiClient,
    store: Arc<dyn CredentialStore>,
}

impl HttpUserDirectory {
    pub fn new(api: ApiClient, store: Arc<dyn CredentialStore>) -> Self {
        Self { api, store }
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn list_users(&self, query: &UserQuery) -> Result<Vec<DirectoryEntry>, ClientError> {
        let token = bearer_token(self.store.as_ref()).await?;
        tracing::debug!(role = ?query.role, search = ?query.search, "listing users");

        self.api
            .send_json(self.api.get("/users").bearer_auth(token).query(query))
            .await
    }
}
