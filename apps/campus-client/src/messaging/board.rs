use std::sync::Arc;

use tokio::sync::watch;

use crate::error::ClientError;
use crate::messaging::model::{Discussion, NewDiscussion};
use crate::messaging::service::MessagingService;

/// Observable discussion list.
#[derive(Debug, Clone, Default)]
pub struct BoardState {
    pub discussions: Vec<Discussion>,
    pub loading: bool,
    pub error: Option<ClientError>,
}

/// The current user's discussions, kept in sync with the backend.
pub struct DiscussionBoard {
    messaging: Arc<dyn MessagingService>,
    state: watch::Sender<BoardState>,
}

impl DiscussionBoard {
    pub fn new(messaging: Arc<dyn MessagingService>) -> Self {
        let (state, _) = watch::channel(BoardState::default());
        Self { messaging, state }
    }

    pub fn snapshot(&self) -> BoardState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BoardState> {
        self.state.subscribe()
    }

    /// Re-fetch the discussion list. On failure the previous list is kept.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        self.state.send_modify(|state| state.loading = true);

        let outcome = self.messaging.list_discussions().await;
        self.state.send_modify(|state| {
            state.loading = false;
            match &outcome {
                Ok(discussions) => {
                    state.discussions = discussions.clone();
                    state.error = None;
                }
                Err(err) => state.error = Some(err.clone()),
            }
        });

        outcome.map(|discussions| {
            tracing::debug!(count = discussions.len(), "discussions refreshed");
        })
    }

    /// Create a discussion, then refresh the list.
    ///
    /// Only the creation decides the outcome; a failed refresh is logged and
    /// left in the board's error state.
    pub async fn start_discussion(&self, new: &NewDiscussion) -> Result<Discussion, ClientError> {
        let discussion = self.messaging.create_discussion(new).await?;
        tracing::info!(discussion_id = %discussion.id, "discussion created");

        if let Err(err) = self.refresh().await {
            tracing::warn!(?err, "discussion list refresh after create failed");
        }
        Ok(discussion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::model::Message;
    use async_trait::async_trait;
    use campus_common::UserId;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct FakeMessaging {
        discussions: Mutex<Vec<Discussion>>,
        list_failure: Mutex<Option<ClientError>>,
        create_failure: Mutex<Option<ClientError>>,
    }

    fn discussion(id: &str, title: &str) -> Discussion {
        serde_json::from_value(serde_json::json!({ "id": id, "title": title })).unwrap()
    }

    #[async_trait]
    impl MessagingService for FakeMessaging {
        async fn list_discussions(&self) -> Result<Vec<Discussion>, ClientError> {
            if let Some(err) = self.list_failure.lock().clone() {
                return Err(err);
            }
            Ok(self.discussions.lock().clone())
        }

        async fn create_discussion(&self, new: &NewDiscussion) -> Result<Discussion, ClientError> {
            if let Some(err) = self.create_failure.lock().clone() {
                return Err(err);
            }
            let mut discussions = self.discussions.lock();
            let created = discussion(&format!("d{}", discussions.len() + 1), &new.title_or_default());
            discussions.push(created.clone());
            Ok(created)
        }

        async fn list_messages(&self, _discussion_id: &str) -> Result<Vec<Message>, ClientError> {
            Ok(Vec::new())
        }

        async fn send_message(&self, _discussion_id: &str, _content: &str) -> Result<Message, ClientError> {
            Err(ClientError::validation("not supported"))
        }
    }

    fn new_direct() -> NewDiscussion {
        NewDiscussion::new([UserId::new("u2")], "hello", None).unwrap()
    }

    #[tokio::test]
    async fn start_discussion_refreshes_the_list() {
        let messaging = Arc::new(FakeMessaging::default());
        let board = DiscussionBoard::new(messaging.clone());

        let created = board.start_discussion(&new_direct()).await.unwrap();
        assert_eq!(created.title, "Discussion with 1 participant(s)");

        let state = board.snapshot();
        assert_eq!(state.discussions.len(), 1);
        assert!(!state.loading);
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn failed_refresh_does_not_fail_creation() {
        let messaging = Arc::new(FakeMessaging::default());
        *messaging.list_failure.lock() = Some(ClientError::network("timeout"));
        let board = DiscussionBoard::new(messaging.clone());

        let created = board.start_discussion(&new_direct()).await;
        assert!(created.is_ok());
        assert!(matches!(board.snapshot().error, Some(ClientError::Network(_))));
    }

    #[tokio::test]
    async fn failed_creation_is_returned() {
        let messaging = Arc::new(FakeMessaging::default());
        *messaging.create_failure.lock() = Some(ClientError::Forbidden);
        let board = DiscussionBoard::new(messaging.clone());

        let err = board.start_discussion(&new_direct()).await.unwrap_err();
        assert_eq!(err, ClientError::Forbidden);
        assert!(board.snapshot().discussions.is_empty());
    }

    #[tokio::test]
    async fn refresh_failure_keeps_previous_list() {
        let messaging = Arc::new(FakeMessaging::default());
        messaging.discussions.lock().push(discussion("d1", "Algebra"));
        let board = DiscussionBoard::new(messaging.clone());
        board.refresh().await.unwrap();

        *messaging.list_failure.lock() = Some(ClientError::Unauthenticated);
        assert_eq!(board.refresh().await, Err(ClientError::Unauthenticated));

        let state = board.snapshot();
        assert_eq!(state.discussions.len(), 1);
        assert_eq!(state.error, Some(ClientError::Unauthenticated));
    }
}
