use serde::{Deserialize, Serialize};

use campus_common::{Role, UserId};

use crate::error::ClientError;

/// Directory record as the backend sends it. Only the id is guaranteed.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryEntry {
    pub id: UserId,
    #[serde(default, alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(default, alias = "lastName")]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// A selectable user: a directory record carrying both a first and a last name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryUser {
    id: UserId,
    first_name: String,
    last_name: String,
    email: Option<String>,
}

impl DirectoryUser {
    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Option label: "First Last (email)".
    pub fn label(&self) -> String {
        match &self.email {
            Some(email) => format!("{} ({email})", self.display_name()),
            None => self.display_name(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl TryFrom<DirectoryEntry> for DirectoryUser {
    type Error = ClientError;

    fn try_from(entry: DirectoryEntry) -> Result<Self, Self::Error> {
        if entry.id.is_blank() {
            return Err(ClientError::malformed("directory entry has an empty id"));
        }
        match (non_blank(entry.first_name), non_blank(entry.last_name)) {
            (Some(first_name), Some(last_name)) => Ok(Self {
                id: entry.id,
                first_name,
                last_name,
                email: non_blank(entry.email),
            }),
            _ => Err(ClientError::malformed(format!(
                "directory entry {} lacks a first or last name",
                entry.id
            ))),
        }
    }
}

/// Filters sent to the user directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}
