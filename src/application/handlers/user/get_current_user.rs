//! GetCurrentUserHandler - the signed-in user with their recent chats.

use std::sync::Arc;

use crate::application::ChatError;
use crate::domain::conversation::ConversationSummary;
use crate::domain::foundation::UserId;
use crate::domain::user::User;
use crate::ports::{ConversationStore, UserRepository};

/// Number of conversations included with the profile.
pub const RECENT_CONVERSATIONS: usize = 10;

#[derive(Debug, Clone)]
pub struct GetCurrentUserQuery {
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUserView {
    pub user: User,
    pub recent_conversations: Vec<ConversationSummary>,
}

pub struct GetCurrentUserHandler {
    users: Arc<dyn UserRepository>,
    store: Arc<dyn ConversationStore>,
}

impl GetCurrentUserHandler {
    pub fn new(users: Arc<dyn UserRepository>, store: Arc<dyn ConversationStore>) -> Self {
        Self { users, store }
    }

    pub async fn handle(&self, query: GetCurrentUserQuery) -> Result<CurrentUserView, ChatError> {
        let user = self
            .users
            .find_by_id(&query.user_id)
            .await?
            .ok_or_else(|| ChatError::not_found("User", &query.user_id))?;

        let mut recent_conversations = self.store.list_conversations(&query.user_id).await?;
        recent_conversations.truncate(RECENT_CONVERSATIONS);

        Ok(CurrentUserView {
            user,
            recent_conversations,
        })
    }
}
