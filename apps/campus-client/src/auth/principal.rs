use serde::{Deserialize, Serialize};

use campus_common::{Role, UserId};

use crate::error::ClientError;

/// The authenticated identity behind the current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub role: Role,
    pub display_name: String,
}

impl Principal {
    pub fn new(id: impl Into<UserId>, role: Role, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            display_name: display_name.into(),
        }
    }

    /// Reject principals that cannot identify anyone.
    pub fn validate(self) -> Result<Self, ClientError> {
        if self.id.is_blank() {
            return Err(ClientError::malformed("principal has an empty id"));
        }
        Ok(self)
    }
}

/// User profile as returned by `GET /auth/me` (and embedded in the token response).
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileResponse {
    pub id: UserId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(default, alias = "lastName")]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, alias = "isActive")]
    pub is_active: Option<bool>,
}

impl ProfileResponse {
    /// "First Last", falling back to the username, then the email.
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !full.is_empty() {
            return full;
        }
        self.username
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| self.id.to_string())
    }
}

impl TryFrom<ProfileResponse> for Principal {
    type Error = ClientError;

    fn try_from(profile: ProfileResponse) -> Result<Self, Self::Error> {
        if profile.is_active == Some(false) {
            return Err(ClientError::AccountDisabled {
                message: "Your account has been disabled.".to_string(),
            });
        }
        let raw_role = profile
            .role
            .as_deref()
            .ok_or_else(|| ClientError::malformed("profile has no role"))?;
        let role: Role = raw_role
            .parse()
            .map_err(|e: campus_common::role::UnknownRole| ClientError::malformed(e.to_string()))?;
        let display_name = profile.display_name();
        Principal::new(profile.id, role, display_name).validate()
    }
}
