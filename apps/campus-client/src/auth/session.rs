//! Process-wide session state and the access decisions derived from it.
//!
//! [`SessionGate`] is the single source of truth for who the current user is.
//! It is cheap to clone and is passed explicitly to whatever needs it: the
//! route guard, the recipient resolver factory, the CLI.
//!
//! State machine:
//!
//! ```text
//! Unknown --restore--> Authenticated | Anonymous
//! Anonymous --login ok--> Authenticated
//! Authenticated --logout--> Anonymous
//! ```
//!
//! `Checking` is a transient state while `restore` or `login` is in flight.
//! It only drives loading indicators; for access decisions it counts as
//! unauthenticated.

use std::sync::Arc;

use tokio::sync::watch;

use campus_common::{Role, UserId};

use crate::auth::principal::Principal;
use crate::auth::service::{AuthService, LoginOutcome};
use crate::auth::store::CredentialStore;
use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Persisted credentials have not been looked at yet.
    Unknown,
    Checking,
    Authenticated,
    Anonymous,
}

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    DenyUnauthenticated,
    DenyWrongRole,
}

/// Snapshot of the session.
///
/// `status == Authenticated` iff a principal is present; the constructors are
/// the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    principal: Option<Principal>,
    status: SessionStatus,
}

impl Session {
    pub fn unknown() -> Self {
        Self {
            principal: None,
            status: SessionStatus::Unknown,
        }
    }

    pub fn checking() -> Self {
        Self {
            principal: None,
            status: SessionStatus::Checking,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            principal: None,
            status: SessionStatus::Anonymous,
        }
    }

    pub fn authenticated(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
            status: SessionStatus::Authenticated,
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    /// Whether the session is still being settled.
    pub fn is_pending(&self) -> bool {
        matches!(self.status, SessionStatus::Unknown | SessionStatus::Checking)
    }

    /// Access check for a boundary that needs `required` (or any signed-in user).
    pub fn authorize(&self, required: Option<Role>) -> Access {
        match required {
            Some(role) => self.authorize_any(&[role]),
            None => self.authorize_any(&[]),
        }
    }

    /// Access check for a boundary open to any of `allowed`. Empty means any role.
    pub fn authorize_any(&self, allowed: &[Role]) -> Access {
        let principal = match (&self.status, &self.principal) {
            (SessionStatus::Authenticated, Some(p)) => p,
            _ => return Access::DenyUnauthenticated,
        };
        if allowed.is_empty() || allowed.contains(&principal.role) {
            Access::Allow
        } else {
            Access::DenyWrongRole
        }
    }
}

/// Shared handle on the session.
#[derive(Clone)]
pub struct SessionGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    store: Arc<dyn CredentialStore>,
    auth: Arc<dyn AuthService>,
    state: watch::Sender<Session>,
}

impl SessionGate {
    pub fn new(store: Arc<dyn CredentialStore>, auth: Arc<dyn AuthService>) -> Self {
        let (state, _) = watch::channel(Session::unknown());
        Self {
            inner: Arc::new(GateInner { store, auth, state }),
        }
    }

    /// Current snapshot.
    pub fn session(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every session change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    pub fn current_user_id(&self) -> Option<UserId> {
        self.inner
            .state
            .borrow()
            .principal()
            .map(|p| p.id.clone())
    }

    pub fn authorize(&self, required: Option<Role>) -> Access {
        self.inner.state.borrow().authorize(required)
    }

    pub fn authorize_any(&self, allowed: &[Role]) -> Access {
        self.inner.state.borrow().authorize_any(allowed)
    }

    /// Rebuild the session from persisted credentials.
    ///
    /// Never fails: anything unusable in the store is discarded and the
    /// session settles as `Anonymous`.
    pub async fn restore(&self) -> Session {
        self.set(Session::checking());

        let session = match self.load_persisted().await {
            Ok(Some(principal)) => {
                tracing::info!(user_id = %principal.id, role = %principal.role, "session restored");
                Session::authenticated(principal)
            }
            Ok(None) => {
                tracing::debug!("no stored session");
                Session::anonymous()
            }
            Err(err) => {
                tracing::warn!(%err, "discarding unusable stored session");
                self.discard_credentials().await;
                Session::anonymous()
            }
        };

        self.set(session.clone());
        session
    }

    /// Sign in. Failures are returned as-is and never retried.
    ///
    /// Collaborators read the bearer token from the store, so a token that
    /// cannot be saved fails the login.
    pub async fn login(&self, email: &str, secret: &str) -> Result<Principal, ClientError> {
        self.set(Session::checking());

        match self.inner.auth.login(email, secret).await {
            Ok(LoginOutcome { principal, token }) => {
                if let Err(err) = self.inner.store.set_token(&token).await {
                    tracing::warn!(%email, %err, "failed to persist access token");
                    self.discard_credentials().await;
                    self.set(Session::anonymous());
                    return Err(err);
                }
                self.persist_profile(&principal).await;
                tracing::info!(user_id = %principal.id, role = %principal.role, "login succeeded");
                self.set(Session::authenticated(principal.clone()));
                Ok(principal)
            }
            Err(err) => {
                tracing::warn!(%email, %err, "login failed");
                self.discard_credentials().await;
                self.set(Session::anonymous());
                Err(err)
            }
        }
    }

    /// Sign out. A no-op when already anonymous.
    pub async fn logout(&self) {
        if self.session().status() == SessionStatus::Anonymous {
            tracing::debug!("logout while anonymous, nothing to do");
            return;
        }
        if let Err(err) = self.inner.auth.logout().await {
            tracing::warn!(%err, "auth service logout failed");
        }
        self.discard_credentials().await;
        self.set(Session::anonymous());
        tracing::info!("logged out");
    }

    async fn load_persisted(&self) -> Result<Option<Principal>, ClientError> {
        let token = match self.inner.store.get_token().await? {
            Some(token) if !token.trim().is_empty() => token,
            _ => return Ok(None),
        };

        match self.inner.store.get_profile().await? {
            Some(raw) => {
                let principal: Principal = serde_json::from_str(&raw)?;
                Ok(Some(principal.validate()?))
            }
            None => {
                tracing::debug!("token without profile, asking the backend");
                let principal = self.inner.auth.current_user(&token).await?;
                self.persist_profile(&principal).await;
                Ok(Some(principal))
            }
        }
    }

    async fn persist_profile(&self, principal: &Principal) {
        let result = match serde_json::to_string(principal) {
            Ok(raw) => self.inner.store.set_profile(&raw).await,
            Err(e) => Err(ClientError::storage(e.to_string())),
        };
        if let Err(err) = result {
            tracing::warn!(%err, "failed to persist profile");
        }
    }

    async fn discard_credentials(&self) {
        if let Err(err) = self.inner.store.clear().await {
            tracing::warn!(%err, "failed to clear stored credentials");
        }
    }

    fn set(&self, session: Session) {
        self.inner.state.send_replace(session);
    }
}
