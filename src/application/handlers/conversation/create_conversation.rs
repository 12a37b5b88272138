//! CreateConversationHandler - Command handler for starting an empty chat.

use std::sync::Arc;

use crate::application::ChatError;
use crate::domain::conversation::{resolve_title, Conversation};
use crate::domain::foundation::UserId;
use crate::ports::ConversationStore;

/// Command to create a conversation.
#[derive(Debug, Clone)]
pub struct CreateConversationCommand {
    pub user_id: UserId,
    /// Blank or missing becomes the default title.
    pub title: Option<String>,
}

pub struct CreateConversationHandler {
    store: Arc<dyn ConversationStore>,
}

impl CreateConversationHandler {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, cmd: CreateConversationCommand) -> Result<Conversation, ChatError> {
        let title = resolve_title(cmd.title.as_deref());
        let conversation = self.store.create_conversation(&cmd.user_id, &title).await?;
        tracing::info!(conversation_id = %conversation.id(), "conversation created");
        Ok(conversation)
    }
}
