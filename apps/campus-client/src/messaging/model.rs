use chrono::{DateTime, Utc};
use serde::Deserialize;

use campus_common::id::string_or_number;
use campus_common::time;
use campus_common::UserId;

use crate::error::ClientError;

/// Discussion participant as embedded in discussion payloads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Participant {
    pub id: UserId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(default, alias = "lastName")]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl Participant {
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !full.is_empty() {
            return full;
        }
        self.name
            .as_deref()
            .or(self.username.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| self.id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Message {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub content: String,
    #[serde(default, alias = "userId")]
    pub user_id: Option<UserId>,
    #[serde(default, alias = "userName")]
    pub user_name: Option<String>,
    #[serde(default, alias = "createdAt", deserialize_with = "time::deserialize_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sender: Option<Participant>,
}

impl Message {
    /// Author label: the sender's name, then the flat user name, then the user id.
    pub fn author(&self) -> String {
        if let Some(sender) = &self.sender {
            return sender.display_name();
        }
        self.user_name
            .clone()
            .or_else(|| self.user_id.as_ref().map(UserId::to_string))
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Discussion {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "createdBy")]
    pub created_by: Option<UserId>,
    #[serde(default, alias = "createdAt", deserialize_with = "time::deserialize_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "lastMessageAt", deserialize_with = "time::deserialize_option")]
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "messageCount")]
    pub message_count: u64,
    #[serde(default, alias = "isGroup")]
    pub is_group: bool,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default, alias = "lastMessage")]
    pub last_message: Option<Message>,
}

/// A validated request to open a discussion.
///
/// A single participant makes a one-to-one discussion, which never carries a
/// title. Two or more make a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDiscussion {
    title: Option<String>,
    participant_ids: Vec<UserId>,
    initial_message: String,
    is_group: bool,
}

impl NewDiscussion {
    pub fn new(
        participants: impl IntoIterator<Item = UserId>,
        message: &str,
        title: Option<&str>,
    ) -> Result<Self, ClientError> {
        let mut participant_ids: Vec<UserId> = Vec::new();
        for id in participants {
            if !id.is_blank() && !participant_ids.contains(&id) {
                participant_ids.push(id);
            }
        }
        if participant_ids.is_empty() {
            return Err(ClientError::validation("Select at least one participant."));
        }

        let initial_message = message.trim();
        if initial_message.is_empty() {
            return Err(ClientError::validation("The first message cannot be empty."));
        }

        let is_group = participant_ids.len() > 1;
        let title = title
            .map(str::trim)
            .filter(|title| is_group && !title.is_empty())
            .map(str::to_string);

        Ok(Self {
            title,
            participant_ids,
            initial_message: initial_message.to_string(),
            is_group,
        })
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn participant_ids(&self) -> &[UserId] {
        &self.participant_ids
    }

    pub fn initial_message(&self) -> &str {
        &self.initial_message
    }

    pub fn is_group(&self) -> bool {
        self.is_group
    }

    /// Title sent to the backend, which requires one even for one-to-one discussions.
    pub fn title_or_default(&self) -> String {
        match &self.title {
            Some(title) => title.clone(),
            None => format!(
                "Discussion with {} participant(s)",
                self.participant_ids.len()
            ),
        }
    }
}
