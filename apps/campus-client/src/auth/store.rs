//! Persistence for the access token and the signed-in user's profile.

use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Abstraction over where session credentials live between runs.
///
/// Backed by a JSON file for the CLI and an in-memory value in tests.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_token(&self) -> Result<Option<String>, ClientError>;
    async fn set_token(&self, token: &str) -> Result<(), ClientError>;
    /// Serialized principal saved at login, if any.
    async fn get_profile(&self) -> Result<Option<String>, ClientError>;
    async fn set_profile(&self, profile: &str) -> Result<(), ClientError>;
    async fn clear(&self) -> Result<(), ClientError>;
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct StoredCredentials {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    profile: Option<String>,
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryCredentialStore {
    data: Mutex<StoredCredentials>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-loaded with a token and, optionally, a raw profile string.
    pub fn seeded(token: Option<&str>, profile: Option<&str>) -> Self {
        Self {
            data: Mutex::new(StoredCredentials {
                token: token.map(str::to_string),
                profile: profile.map(str::to_string),
            }),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get_token(&self) -> Result<Option<String>, ClientError> {
        Ok(self.data.lock().token.clone())
    }

    async fn set_token(&self, token: &str) -> Result<(), ClientError> {
        self.data.lock().token = Some(token.to_string());
        Ok(())
    }

    async fn get_profile(&self) -> Result<Option<String>, ClientError> {
        Ok(self.data.lock().profile.clone())
    }

    async fn set_profile(&self, profile: &str) -> Result<(), ClientError> {
        self.data.lock().profile = Some(profile.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<(), ClientError> {
        *self.data.lock() = StoredCredentials::default();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File-backed implementation
// ---------------------------------------------------------------------------

/// Credentials kept in a single JSON file, rewritten atomically on change.
pub struct FileCredentialStore {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file.
    write_lock: tokio::sync::Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<StoredCredentials, ClientError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                ClientError::storage(format!("corrupt credentials file {}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoredCredentials::default()),
            Err(e) => Err(ClientError::storage(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn save(&self, creds: &StoredCredentials) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ClientError::storage(format!("failed to create {}: {e}", parent.display())))?;
        }
        let body = serde_json::to_string_pretty(creds)
            .map_err(|e| ClientError::storage(format!("serialization: {e}")))?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| ClientError::storage(format!("failed to write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| ClientError::storage(format!("failed to replace {}: {e}", self.path.display())))
    }

    async fn update(&self, apply: impl FnOnce(&mut StoredCredentials)) -> Result<(), ClientError> {
        let _guard = self.write_lock.lock().await;
        // A corrupt file is overwritten rather than blocking new credentials.
        let mut creds = self.load().await.unwrap_or_default();
        apply(&mut creds);
        self.save(&creds).await
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get_token(&self) -> Result<Option<String>, ClientError> {
        Ok(self.load().await?.token)
    }

    async fn set_token(&self, token: &str) -> Result<(), ClientError> {
        let token = token.to_string();
        self.update(|c| c.token = Some(token)).await
    }

    async fn get_profile(&self) -> Result<Option<String>, ClientError> {
        Ok(self.load().await?.profile)
    }

    async fn set_profile(&self, profile: &str) -> Result<(), ClientError> {
        let profile = profile.to_string();
        self.update(|c| c.profile = Some(profile)).await
    }

    async fn clear(&self) -> Result<(), ClientError> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::storage(format!(
                "failed to remove {}: {e}",
                self.path.display()
            ))),
        }
    }
}
