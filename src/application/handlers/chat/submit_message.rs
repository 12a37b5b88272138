//! SubmitMessageHandler - sends a user message and streams the reply.
//!
//! Without a conversation id a new conversation is created, titled after the
//! message. The user message is persisted before the provider is asked, so a
//! failed generation never loses what the user typed.

use std::sync::Arc;

use crate::application::handlers::load_owned_conversation;
use crate::application::{ChatError, SessionRegistry, StreamReconciler, TurnHandle};
use crate::domain::conversation::{title_from_first_message, validate_content, Conversation, Message, Role};
use crate::domain::foundation::{ConversationId, DomainError, UserId};
use crate::ports::ConversationStore;

#[derive(Debug, Clone)]
pub struct SubmitMessageCommand {
    pub user_id: UserId,
    /// `None` starts a new conversation.
    pub conversation_id: Option<ConversationId>,
    pub content: String,
}

pub struct SubmitMessageResult {
    pub conversation: Conversation,
    /// True if this message started the conversation.
    pub created: bool,
    pub user_message: Message,
    pub turn: TurnHandle,
}

pub struct SubmitMessageHandler {
    store: Arc<dyn ConversationStore>,
    registry: Arc<SessionRegistry>,
    reconciler: Arc<StreamReconciler>,
}

impl SubmitMessageHandler {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        registry: Arc<SessionRegistry>,
        reconciler: Arc<StreamReconciler>,
    ) -> Self {
        Self {
            store,
            registry,
            reconciler,
        }
    }

    pub async fn handle(&self, cmd: SubmitMessageCommand) -> Result<SubmitMessageResult, ChatError> {
        // 1. Validate before anything is created
        validate_content(&cmd.content)?;

        // 2. Resolve the conversation
        let (conversation, created) = match cmd.conversation_id {
            Some(id) => (
                load_owned_conversation(self.store.as_ref(), &id, &cmd.user_id).await?,
                false,
            ),
            None => {
                let title = title_from_first_message(&cmd.content);
                let conversation = self
                    .store
                    .create_conversation(&cmd.user_id, &title)
                    .await
                    .map_err(persistence)?;
                tracing::info!(conversation_id = %conversation.id(), "conversation created");
                (conversation, true)
            }
        };

        // 3. Claim the session and persist the user message
        let session = self.registry.open(&conversation).await?;
        let (generation, user_message, history) = {
            let mut guard = session.lock().await;
            let generation = guard.begin_turn()?;

            let user_message = match self
                .store
                .create_message(conversation.id(), Role::User, &cmd.content)
                .await
            {
                Ok(message) => message,
                Err(err) => {
                    guard.supersede();
                    return Err(persistence(err));
                }
            };
            guard.append(user_message.clone());
            (generation, user_message, guard.messages().to_vec())
        };

        // 4. Ask the provider; the reconciler owns the turn from here
        let turn = self
            .reconciler
            .start(session, &cmd.user_id, generation, &history)
            .await?;

        tracing::debug!(
            conversation_id = %conversation.id(),
            generation = %generation,
            "turn started"
        );

        Ok(SubmitMessageResult {
            conversation,
            created,
            user_message,
            turn,
        })
    }
}

fn persistence(err: DomainError) -> ChatError {
    ChatError::PersistenceFailure(err.message)
}
