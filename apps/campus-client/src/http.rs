//! Thin wrapper over `reqwest` shared by the backend collaborators.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::auth::store::CredentialStore;
use crate::error::ClientError;

/// HTTP client bound to the backend API origin.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

/// Error body shape of the backend (`{"detail": ...}`), with a `message` fallback.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
    message: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Absolute URL for an API path (`path` starts with `/`).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.http.get(self.url(path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.http.post(self.url(path))
    }

    /// Send a request and decode a successful JSON body.
    ///
    /// 401 and 403 map to `Unauthenticated` / `Forbidden`; any other
    /// non-success status becomes a `Network` error carrying the backend detail.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(error_for_status(resp).await);
        }
        Ok(resp.json().await?)
    }
}

/// Map a non-success response to a client error.
pub async fn error_for_status(resp: Response) -> ClientError {
    let status = resp.status();
    match status {
        StatusCode::UNAUTHORIZED => ClientError::Unauthenticated,
        StatusCode::FORBIDDEN => ClientError::Forbidden,
        _ => {
            let url = resp.url().to_string();
            let detail = error_detail(resp)
                .await
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
            tracing::warn!(%url, %status, %detail, "backend returned an error");
            ClientError::network(format!("HTTP {status}: {detail}"))
        }
    }
}

/// Extract the human-readable detail from an error response, if any.
pub async fn error_detail(resp: Response) -> Option<String> {
    let text = resp.text().await.ok()?;
    let body: ErrorBody = serde_json::from_str(&text).ok()?;
    match body.detail {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
        None => body.message,
    }
}

/// Read the bearer token from the credential store.
///
/// A missing or blank token fails with `Unauthenticated` without touching the network.
pub async fn bearer_token(store: &dyn CredentialStore) -> Result<String, ClientError> {
    match store.get_token().await? {
        Some(token) if !token.trim().is_empty() => Ok(token),
        _ => {
            tracing::debug!("no stored access token");
            Err(ClientError::Unauthenticated)
        }
    }
}
