//! EditMessageHandler - rewrites a user message and regenerates from it.
//!
//! Editing is destructive: every message after the edited one is deleted,
//! in memory and in the store, and a new turn starts from the edited prefix.
//! An active turn is superseded rather than rejected.
//!
//! The session lock is held from the edit until the store agrees, so no
//! reader observes a truncation that is later rolled back.

use std::sync::Arc;

use crate::application::handlers::load_owned_conversation;
use crate::application::{ChatError, SessionRegistry, StreamReconciler, TurnHandle};
use crate::domain::conversation::{Conversation, Message};
use crate::domain::foundation::{ConversationId, MessageId, UserId};
use crate::ports::ConversationStore;

#[derive(Debug, Clone)]
pub struct EditMessageCommand {
    pub user_id: UserId,
    pub conversation_id: ConversationId,
    pub message_id: MessageId,
    pub content: String,
}

pub struct EditMessageResult {
    pub conversation: Conversation,
    pub edited: Message,
    /// Messages deleted from the store after the edited one.
    pub removed: u64,
    pub turn: TurnHandle,
}

pub struct EditMessageHandler {
    store: Arc<dyn ConversationStore>,
    registry: Arc<SessionRegistry>,
    reconciler: Arc<StreamReconciler>,
}

impl EditMessageHandler {
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

    pub async fn handle(&self, cmd: EditMessageCommand) -> Result<EditMessageResult, ChatError> {
        // 1. Authorize
        let conversation =
            load_owned_conversation(self.store.as_ref(), &cmd.conversation_id, &cmd.user_id)
                .await?;
        let session = self.registry.open(&conversation).await?;

        let (edited, removed, generation, history) = {
            let mut guard = session.lock().await;

            // 2. Edit in memory; rejected edits change nothing
            let snapshot = guard.snapshot();
            let edited = guard.edit(&cmd.message_id, &cmd.content)?;

            // 3. Drop the tail in the store
            let removed = match self
                .store
                .delete_messages_after(&cmd.conversation_id, edited.position())
                .await
            {
                Ok(removed) => removed,
                Err(err) => {
                    tracing::error!(
                        conversation_id = %cmd.conversation_id,
                        error = %err,
                        "failed to truncate history, restoring session"
                    );
                    guard.restore(snapshot);
                    return Err(ChatError::PersistenceFailure(err.message));
                }
            };

            // 4. Persist the new content. The tail is already gone, so the
            //    session falls back to the truncated prefix with old content
            //    and any turn that was running against the old tail ends.
            if let Err(err) = self
                .store
                .update_message_content(edited.id(), edited.content())
                .await
            {
                tracing::error!(
                    conversation_id = %cmd.conversation_id,
                    message_id = %edited.id(),
                    error = %err,
                    "failed to persist edit, resyncing session"
                );
                guard.restore(snapshot);
                guard.supersede();
                guard.truncate_after(edited.id())?;
                return Err(ChatError::PersistenceFailure(err.message));
            }

            // 5. Start the replacement turn
            let generation = guard.begin_turn()?;
            (edited, removed, generation, guard.messages().to_vec())
        };

        tracing::info!(
            conversation_id = %cmd.conversation_id,
            message_id = %edited.id(),
            removed,
            generation = %generation,
            "message edited"
        );

        let turn = self
            .reconciler
            .start(session, &cmd.user_id, generation, &history)
            .await?;

        Ok(EditMessageResult {
            conversation,
            edited,
            removed,
            turn,
        })
    }
}
