use thiserror::Error;

/// Failure kinds surfaced by the session gate, the recipient resolver and the
/// backend collaborators.
///
/// `Clone` so a failure can sit inside observable component state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("account disabled: {message}")]
    AccountDisabled { message: String },

    #[error("authentication required")]
    Unauthenticated,

    #[error("access forbidden")]
    Forbidden,

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("credential storage error: {0}")]
    Storage(String),

    #[error("invalid request: {0}")]
    Validation(String),
}

impl ClientError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the caller should send the user back through login.
    pub fn requires_reauth(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::Forbidden)
    }

    /// Message suitable for display to an end user.
    pub fn user_message(&self, support_contact: &str) -> String {
        match self {
            Self::InvalidCredentials => {
                "Wrong email or password. Please try again.".to_string()
            }
            Self::AccountDisabled { message } => format!(
                "{message} Contact {support_contact} to reactivate your account."
            ),
            Self::Unauthenticated | Self::Forbidden => {
                "Your session has expired. Please sign in again.".to_string()
            }
            Self::Network(_) | Self::MalformedResponse(_) => {
                "Could not reach the server. Please retry.".to_string()
            }
            Self::Storage(_) => "Could not access saved credentials.".to_string(),
            Self::Validation(message) => message.clone(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            tracing::warn!(?err, "response body did not match the expected shape");
            Self::malformed(err.to_string())
        } else {
            tracing::error!(?err, "request failed");
            Self::network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed(err.to_string())
    }
}
