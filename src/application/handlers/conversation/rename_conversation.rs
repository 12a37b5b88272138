//! RenameConversationHandler - Command handler for renaming conversations.

use std::sync::Arc;

use crate::application::handlers::load_owned_conversation;
use crate::application::{ChatError, SessionRegistry};
use crate::domain::conversation::Conversation;
use crate::domain::foundation::{ConversationId, UserId};
use crate::ports::ConversationStore;

#[derive(Debug, Clone)]
pub struct RenameConversationCommand {
    pub user_id: UserId,
    pub conversation_id: ConversationId,
    pub title: String,
}

pub struct RenameConversationHandler {
    store: Arc<dyn ConversationStore>,
    registry: Arc<SessionRegistry>,
}

impl RenameConversationHandler {
    pub fn new(store: Arc<dyn ConversationStore>, registry: Arc<SessionRegistry>) -> Self {
        Self { store, registry }
    }

    pub async fn handle(&self, cmd: RenameConversationCommand) -> Result<Conversation, ChatError> {
        // 1. Load and authorize
        let mut conversation =
            load_owned_conversation(self.store.as_ref(), &cmd.conversation_id, &cmd.user_id)
                .await?;

        // 2. Apply rename
        conversation.rename(&cmd.title)?;

        // 3. Persist
        self.store
            .rename_conversation(conversation.id(), conversation.title())
            .await?;

        // 4. Keep an open session in step
        if let Some(session) = self.registry.get(conversation.id()).await {
            session.lock().await.update_conversation(conversation.clone());
        }

        Ok(conversation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryConversationStore;

    async fn setup() -> (Arc<InMemoryConversationStore>, Arc<SessionRegistry>, Conversation) {
        let store = Arc::new(InMemoryConversationStore::new());
        let registry = Arc::new(SessionRegistry::new(store.clone()));
        let conversation = store
            .create_conversation(&UserId::new("user-1").unwrap(), "Old")
            .await
            .unwrap();
        (store, registry, conversation)
    }

    fn command(user: &str, conversation: &Conversation, title: &str) -> RenameConversationCommand {
        RenameConversationCommand {
            user_id: UserId::new(user).unwrap(),
            conversation_id: *conversation.id(),
            title: title.to_string(),
        }
    }

    #[tokio::test]
    async fn renames_in_store_and_open_session() {
        let (store, registry, conversation) = setup().await;
        let session = registry.open(&conversation).await.unwrap();
        let handler = RenameConversationHandler::new(store.clone(), registry);

        let renamed = handler
            .handle(command("user-1", &conversation, " New name "))
            .await
            .unwrap();

        assert_eq!(renamed.title(), "New name");
        let stored = store.find_conversation(conversation.id()).await.unwrap().unwrap();
        assert_eq!(stored.title(), "New name");
        assert_eq!(session.lock().await.conversation().title(), "New name");
    }

    #[tokio::test]
    async fn blank_title_is_rejected() {
        let (store, registry, conversation) = setup().await;
        let handler = RenameConversationHandler::new(store.clone(), registry);

        let err = handler
            .handle(command("user-1", &conversation, "   "))
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::Validation(_)));
        let stored = store.find_conversation(conversation.id()).await.unwrap().unwrap();
        assert_eq!(stored.title(), "Old");
    }

    #[tokio::test]
    async fn other_user_cannot_rename() {
        let (store, registry, conversation) = setup().await;
        let handler = RenameConversationHandler::new(store, registry);

        let err = handler
            .handle(command("user-2", &conversation, "Mine"))
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::NotFound { .. }));
    }
}
