//! GetConversationHandler - Query handler for one conversation with messages.
//!
//! Reads through the open session, so a reply that is still streaming shows
//! up as its partial placeholder.

use std::sync::Arc;

use crate::application::handlers::load_owned_conversation;
use crate::application::{ChatError, SessionRegistry};
use crate::domain::conversation::{Conversation, Generation, Message, StreamState};
use crate::domain::foundation::{ConversationId, UserId};
use crate::ports::ConversationStore;

#[derive(Debug, Clone)]
pub struct GetConversationQuery {
    pub user_id: UserId,
    pub conversation_id: ConversationId,
}

/// Snapshot of a conversation as the UI renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationView {
    pub conversation: Conversation,
    pub messages: Vec<Message>,
    pub state: StreamState,
    pub generation: Generation,
}

pub struct GetConversationHandler {
    store: Arc<dyn ConversationStore>,
    registry: Arc<SessionRegistry>,
}

impl GetConversationHandler {
    pub fn new(store: Arc<dyn ConversationStore>, registry: Arc<SessionRegistry>) -> Self {
        Self { store, registry }
    }

    pub async fn handle(&self, query: GetConversationQuery) -> Result<ConversationView, ChatError> {
        let conversation =
            load_owned_conversation(self.store.as_ref(), &query.conversation_id, &query.user_id)
                .await?;
        let session = self.registry.open(&conversation).await?;
        let guard = session.lock().await;

        Ok(ConversationView {
            conversation: guard.conversation().clone(),
            messages: guard.messages().to_vec(),
            state: guard.state(),
            generation: guard.generation(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryConversationStore;
    use crate::domain::conversation::Role;

    async fn setup() -> (Arc<InMemoryConversationStore>, Arc<SessionRegistry>, Conversation) {
        let store = Arc::new(InMemoryConversationStore::new());
        let registry = Arc::new(SessionRegistry::new(store.clone()));
        let conversation = store
            .create_conversation(&UserId::new("user-1").unwrap(), "Chat")
            .await
            .unwrap();
        store
            .create_message(conversation.id(), Role::User, "question")
            .await
            .unwrap();
        store
            .create_message(conversation.id(), Role::Assistant, "answer")
            .await
            .unwrap();
        (store, registry, conversation)
    }

    fn query(user: &str, conversation: &Conversation) -> GetConversationQuery {
        GetConversationQuery {
            user_id: UserId::new(user).unwrap(),
            conversation_id: *conversation.id(),
        }
    }

    #[tokio::test]
    async fn returns_messages_in_order() {
        let (store, registry, conversation) = setup().await;
        let handler = GetConversationHandler::new(store, registry);

        let view = handler.handle(query("user-1", &conversation)).await.unwrap();

        let contents: Vec<_> = view.messages.iter().map(|m| m.content()).collect();
        assert_eq!(contents, vec!["question", "answer"]);
        assert_eq!(view.state, StreamState::Idle);
    }

    #[tokio::test]
    async fn shows_streaming_placeholder() {
        let (store, registry, conversation) = setup().await;
        let session = registry.open(&conversation).await.unwrap();
        {
            let mut guard = session.lock().await;
            let generation = guard.begin_turn().unwrap();
            guard.apply_chunk(generation, "partial");
        }
        let handler = GetConversationHandler::new(store, registry);

        let view = handler.handle(query("user-1", &conversation)).await.unwrap();

        assert_eq!(view.state, StreamState::Streaming);
        assert_eq!(view.messages.len(), 3);
        assert_eq!(view.messages[2].content(), "partial");
    }

    #[tokio::test]
    async fn other_users_get_not_found() {
        let (store, registry, conversation) = setup().await;
        let handler = GetConversationHandler::new(store, registry.clone());

        let err = handler.handle(query("user-2", &conversation)).await.unwrap_err();

        assert!(matches!(err, ChatError::NotFound { .. }));
        assert!(registry.is_empty().await);
    }
}
