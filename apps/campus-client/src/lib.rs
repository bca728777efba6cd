pub mod auth;
pub mod config;
pub mod debounce;
pub mod directory;
pub mod error;
pub mod http;
pub mod messaging;

use std::sync::Arc;

use campus_common::Role;

use auth::service::HttpAuthService;
use auth::session::SessionGate;
use auth::store::{CredentialStore, FileCredentialStore};
use config::Config;
use directory::resolver::{RecipientFilters, RecipientResolver, ResolverSettings};
use directory::service::HttpUserDirectory;
use error::ClientError;
use http::ApiClient;
use messaging::board::DiscussionBoard;
use messaging::service::{HttpMessagingService, MessagingService};

/// Collaborators shared by everything the client shows.
///
/// The session gate lives here and is handed out explicitly; components that
/// need their own state (resolvers, boards) are built on demand.
#[derive(Clone)]
pub struct Portal {
    pub config: Arc<Config>,
    pub api: ApiClient,
    pub store: Arc<dyn CredentialStore>,
    pub session: SessionGate,
}

impl Portal {
    /// Wire the HTTP collaborators with a file-backed credential store.
    pub fn new(config: Config) -> Result<Self, ClientError> {
        let store: Arc<dyn CredentialStore> =
            Arc::new(FileCredentialStore::new(config.credentials_path.clone()));
        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: Arc<dyn CredentialStore>) -> Result<Self, ClientError> {
        let api = ApiClient::new(&config.api_url, config.http_timeout)?;
        let auth = Arc::new(HttpAuthService::new(api.clone(), config.login_timeout));
        let session = SessionGate::new(store.clone(), auth);

        Ok(Self {
            config: Arc::new(config),
            api,
            store,
            session,
        })
    }

    /// A fresh resolver for one recipient picker, with its own cache.
    pub fn recipient_resolver(&self) -> RecipientResolver {
        let directory = Arc::new(HttpUserDirectory::new(self.api.clone(), self.store.clone()));
        RecipientResolver::with_settings(directory, ResolverSettings::from(self.config.as_ref()))
    }

    pub fn messaging(&self) -> Arc<dyn MessagingService> {
        Arc::new(HttpMessagingService::new(self.api.clone(), self.store.clone()))
    }

    pub fn discussion_board(&self) -> DiscussionBoard {
        DiscussionBoard::new(self.messaging())
    }

    /// Filters that leave the signed-in user out of the results.
    pub fn recipient_filters(&self, role: Option<Role>, search: impl Into<String>) -> RecipientFilters {
        RecipientFilters::new(role, search, self.session.current_user_id())
    }
}
