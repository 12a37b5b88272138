//! ListConversationsHandler - Query handler for a user's conversations.

use std::sync::Arc;

use crate::application::ChatError;
use crate::domain::conversation::ConversationSummary;
use crate::domain::foundation::UserId;
use crate::ports::ConversationStore;

#[derive(Debug, Clone)]
pub struct ListConversationsQuery {
    pub user_id: UserId,
    /// Keep only the most recent `limit` conversations.
    pub limit: Option<usize>,
}

pub struct ListConversationsHandler {
    store: Arc<dyn ConversationStore>,
}

impl ListConversationsHandler {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    /// Returns conversations most recently updated first.
    pub async fn handle(
        &self,
        query: ListConversationsQuery,
    ) -> Result<Vec<ConversationSummary>, ChatError> {
        let mut summaries = self.store.list_conversations(&query.user_id).await?;
        if let Some(limit) = query.limit {
            summaries.truncate(limit);
        }
        Ok(summaries)
    }
}
