use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use campus_common::UserId;

use crate::auth::store::CredentialStore;
use crate::error::ClientError;
use crate::http::{bearer_token, ApiClient};
use crate::messaging::model::{Discussion, Message, NewDiscussion};

/// Abstraction over the backend's discussion endpoints.
#[async_trait]
pub trait MessagingService: Send + Sync {
    async fn list_discussions(&self) -> Result<Vec<Discussion>, ClientError>;

    async fn create_discussion(&self, new: &NewDiscussion) -> Result<Discussion, ClientError>;

    async fn list_messages(&self, discussion_id: &str) -> Result<Vec<Message>, ClientError>;

    async fn send_message(&self, discussion_id: &str, content: &str) -> Result<Message, ClientError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateDiscussionBody<'a> {
    title: String,
    initial_message: &'a str,
    participant_ids: &'a [UserId],
    is_group: bool,
    tags: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SendMessageBody<'a> {
    content: &'a str,
}

/// `MessagingService` backed by `/discussions`.
pub struct HttpMessagingService {
    api: ApiClient,
    store: Arc<dyn CredentialStore>,
}

impl HttpMessagingService {
    pub fn new(api: ApiClient, store: Arc<dyn CredentialStore>) -> Self {
        Self { api, store }
    }
}

#[async_trait]
impl MessagingService for HttpMessagingService {
    async fn list_discussions(&self) -> Result<Vec<Discussion>, ClientError> {
        let token = bearer_token(self.store.as_ref()).await?;
        self.api
            .send_json(self.api.get("/discussions/").bearer_auth(token))
            .await
    }

    async fn create_discussion(&self, new: &NewDiscussion) -> Result<Discussion, ClientError> {
        let token = bearer_token(self.store.as_ref()).await?;
        let body = CreateDiscussionBody {
            title: new.title_or_default(),
            initial_message: new.initial_message(),
            participant_ids: new.participant_ids(),
            is_group: new.is_group(),
            tags: Vec::new(),
        };
        tracing::info!(
            participants = new.participant_ids().len(),
            is_group = new.is_group(),
            "creating discussion"
        );

        self.api
            .send_json(self.api.post("/discussions/").bearer_auth(token).json(&body))
            .await
    }

    async fn list_messages(&self, discussion_id: &str) -> Result<Vec<Message>, ClientError> {
        let token = bearer_token(self.store.as_ref()).await?;
        let path = format!("/discussions/{discussion_id}/messages");
        self.api
            .send_json(self.api.get(&path).bearer_auth(token))
            .await
    }

    async fn send_message(&self, discussion_id: &str, content: &str) -> Result<Message, ClientError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ClientError::validation("The message cannot be empty."));
        }
        let token = bearer_token(self.store.as_ref()).await?;
        let path = format!("/discussions/{discussion_id}/messages");
        self.api
            .send_json(
                self.api
                    .post(&path)
                    .bearer_auth(token)
                    .json(&SendMessageBody { content }),
            )
            .await
    }
}
