//! DeleteConversationHandler - Command handler for deleting conversations.
//!
//! Messages go with the conversation. A turn still streaming into it is
//! superseded so it never writes into a deleted conversation.

use std::sync::Arc;

use crate::application::handlers::load_owned_conversation;
use crate::application::{ChatError, SessionRegistry};
use crate::domain::foundation::{ConversationId, UserId};
use crate::ports::ConversationStore;

#[derive(Debug, Clone)]
pub struct DeleteConversationCommand {
    pub user_id: UserId,
    pub conversation_id: ConversationId,
}

pub struct DeleteConversationHandler {
    store: Arc<dyn ConversationStore>,
    registry: Arc<SessionRegistry>,
}

impl DeleteConversationHandler {
    pub fn new(store: Arc<dyn ConversationStore>, registry: Arc<SessionRegistry>) -> Self {
        Self { store, registry }
    }

    pub async fn handle(&self, cmd: DeleteConversationCommand) -> Result<(), ChatError> {
        load_owned_conversation(self.store.as_ref(), &cmd.conversation_id, &cmd.user_id).await?;

        match self.registry.get(&cmd.conversation_id).await {
            Some(session) => {
                // Holding the lock keeps the reconciler out until the rows are gone.
                let mut guard = session.lock().await;
                guard.supersede();
                self.store.delete_conversation(&cmd.conversation_id).await?;
            }
            None => self.store.delete_conversation(&cmd.conversation_id).await?,
        }
        self.registry.close(&cmd.conversation_id).await;

        tracing::info!(conversation_id = %cmd.conversation_id, "conversation deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryConversationStore;
    use crate::domain::conversation::{Conversation, Role};

    async fn setup() -> (Arc<InMemoryConversationStore>, Arc<SessionRegistry>, Conversation) {
        let store = Arc::new(InMemoryConversationStore::new());
        let registry = Arc::new(SessionRegistry::new(store.clone()));
        let conversation = store
            .create_conversation(&UserId::new("user-1").unwrap(), "Doomed")
            .await
            .unwrap();
        store
            .create_message(conversation.id(), Role::User, "hi")
            .await
            .unwrap();
        (store, registry, conversation)
    }

    fn command(user: &str, conversation: &Conversation) -> DeleteConversationCommand {
        DeleteConversationCommand {
            user_id: UserId::new(user).unwrap(),
            conversation_id: *conversation.id(),
        }
    }

    #[tokio::test]
    async fn deletes_conversation_messages_and_session() {
        let (store, registry, conversation) = setup().await;
        registry.open(&conversation).await.unwrap();
        let handler = DeleteConversationHandler::new(store.clone(), registry.clone());

        handler.handle(command("user-1", &conversation)).await.unwrap();

        assert_eq!(store.conversation_count().await, 0);
        assert_eq!(store.message_count().await, 0);
        assert!(registry.get(conversation.id()).await.is_none());
    }

    #[tokio::test]
    async fn supersedes_turn_in_flight() {
        let (store, registry, conversation) = setup().await;
        let session = registry.open(&conversation).await.unwrap();
        let generation = session.lock().await.begin_turn().unwrap();
        let handler = DeleteConversationHandler::new(store, registry);

        handler.handle(command("user-1", &conversation)).await.unwrap();

        let guard = session.lock().await;
        assert!(!guard.is_busy());
        assert!(guard.generation() > generation);
    }

    #[tokio::test]
    async fn other_user_cannot_delete() {
        let (store, registry, conversation) = setup().await;
        let handler = DeleteConversationHandler::new(store.clone(), registry);

        let err = handler.handle(command("user-2", &conversation)).await.unwrap_err();

        assert!(matches!(err, ChatError::NotFound { .. }));
        assert_eq!(store.conversation_count().await, 1);
    }
}
