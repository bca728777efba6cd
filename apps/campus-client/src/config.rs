use std::path::PathBuf;
use std::time::Duration;

/// Client configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend API origin including the version prefix (e.g. `http://localhost:8000/api/v1`).
    pub api_url: String,
    /// File the session token and profile are persisted to.
    pub credentials_path: PathBuf,
    /// Timeout applied to every backend request.
    pub http_timeout: Duration,
    /// Timeout for the credential exchange, which the backend can be slow to answer.
    pub login_timeout: Duration,
    /// Quiet period before a recipient search is issued.
    pub resolver_quiet_period: Duration,
    /// How long a resolved recipient list stays usable without a re-fetch.
    pub resolver_cache_ttl: Duration,
    /// Contact shown to users whose account has been disabled.
    pub support_contact: String,
}

impl Config {
    /// Configuration with defaults for everything but the API origin.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            credentials_path: PathBuf::from(".campus/credentials.json"),
            http_timeout: Duration::from_secs(30),
            login_timeout: Duration::from_secs(60),
            resolver_quiet_period: Duration::from_millis(500),
            resolver_cache_ttl: Duration::from_secs(300),
            support_contact: "support@campus.local".to_string(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a required variable is missing.
    pub fn from_env() -> Self {
        let defaults = Self::new(required_var("API_URL"));
        Self {
            credentials_path: std::env::var("CREDENTIALS_PATH")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.credentials_path),
            http_timeout: parsed_var("HTTP_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
            login_timeout: parsed_var("LOGIN_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.login_timeout),
            resolver_quiet_period: parsed_var("RESOLVER_DEBOUNCE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.resolver_quiet_period),
            resolver_cache_ttl: parsed_var("RESOLVER_CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.resolver_cache_ttl),
            support_contact: std::env::var("SUPPORT_CONTACT")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.support_contact),
            api_url: defaults.api_url,
        }
    }
}

fn required_var(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} env var is required"))
}

fn parsed_var(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
