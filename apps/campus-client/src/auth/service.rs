//! Credential exchange with the backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::auth::principal::{Principal, ProfileResponse};
use crate::error::ClientError;
use crate::http::{error_detail, error_for_status, ApiClient};

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub principal: Principal,
    pub token: String,
}

/// Abstraction over the backend's authentication endpoints.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Exchange an email and secret for a token and the matching principal.
    ///
    /// Fails with `InvalidCredentials`, `AccountDisabled` or `Network`.
    async fn login(&self, email: &str, secret: &str) -> Result<LoginOutcome, ClientError>;

    /// Look up the principal a token belongs to.
    async fn current_user(&self, token: &str) -> Result<Principal, ClientError>;

    async fn logout(&self) -> Result<(), ClientError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    user: Option<ProfileResponse>,
}

/// `AuthService` backed by the REST API (`/auth/token`, `/auth/me`).
pub struct HttpAuthService {
    api: ApiClient,
    login_timeout: Duration,
}

impl HttpAuthService {
    pub fn new(api: ApiClient, login_timeout: Duration) -> Self {
        Self { api, login_timeout }
    }
}

#[async_trait]
impl AuthService for HttpAuthService {
    async fn login(&self, email: &str, secret: &str) -> Result<LoginOutcome, ClientError> {
        tracing::info!(%email, "exchanging credentials");

        let resp = self
            .api
            .post("/auth/token")
            .timeout(self.login_timeout)
            .form(&[("username", email), ("password", secret)])
            .send()
            .await?;

        match resp.status() {
            s if s.is_success() => {}
            StatusCode::UNAUTHORIZED => return Err(ClientError::InvalidCredentials),
            StatusCode::FORBIDDEN => {
                let message = error_detail(resp)
                    .await
                    .unwrap_or_else(|| "Your account has been disabled.".to_string());
                return Err(ClientError::AccountDisabled { message });
            }
            _ => return Err(error_for_status(resp).await),
        }

        let body: TokenResponse = resp.json().await?;
        if body.access_token.trim().is_empty() {
            return Err(ClientError::malformed("token response has no access token"));
        }

        let principal = match body.user {
            Some(profile) => Principal::try_from(profile)?,
            None => self.current_user(&body.access_token).await?,
        };

        Ok(LoginOutcome {
            principal,
            token: body.access_token,
        })
    }

    async fn current_user(&self, token: &str) -> Result<Principal, ClientError> {
        let profile: ProfileResponse = self
            .api
            .send_json(self.api.get("/auth/me").bearer_auth(token))
            .await?;
        Principal::try_from(profile)
    }

    async fn logout(&self) -> Result<(), ClientError> {
        // Tokens are stateless on the backend; dropping them locally is enough.
        tracing::debug!("discarding access token");
        Ok(())
    }
}
