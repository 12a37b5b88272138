//! In-memory conversation store.
//!
//! Mirrors the Postgres adapter's semantics: positions are assigned as
//! `max + 1` per conversation and deleting a conversation deletes its
//! messages. Individual operations can be made to fail for rollback tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;

use crate::domain::conversation::{Conversation, ConversationSummary, Message, Role};
use crate::domain::foundation::{
    ConversationId, DomainError, ErrorCode, MessageId, Timestamp, UserId,
};
use crate::ports::ConversationStore;

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    CreateConversation,
    FindConversation,
    ListConversations,
    RenameConversation,
    DeleteConversation,
    CreateMessage,
    UpdateMessageContent,
    DeleteMessagesAfter,
    ListMessages,
}

#[derive(Debug, Default)]
struct State {
    conversations: HashMap<ConversationId, Conversation>,
    messages: HashMap<ConversationId, Vec<Message>>,
}

impl State {
    fn conversation_mut(&mut self, id: &ConversationId) -> Result<&mut Conversation, DomainError> {
        self.conversations
            .get_mut(id)
            .ok_or_else(|| conversation_not_found(id))
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryConversationStore {
    state: Arc<RwLock<State>>,
    failing: Arc<Mutex<HashSet<StoreOperation>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call of `operation` fail with `DatabaseError`.
    pub fn fail_on(&self, operation: StoreOperation) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation);
    }

    /// Lets `operation` succeed again.
    pub fn recover(&self, operation: StoreOperation) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&operation);
    }

    pub async fn conversation_count(&self) -> usize {
        self.state.read().await.conversations.len()
    }

    pub async fn message_count(&self) -> usize {
        self.state.read().await.messages.values().map(Vec::len).sum()
    }

    fn check(&self, operation: StoreOperation) -> Result<(), DomainError> {
        let failing = self.failing.lock().unwrap_or_else(PoisonError::into_inner);
        if failing.contains(&operation) {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("{:?} failed", operation),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn create_conversation(
        &self,
        owner_id: &UserId,
        title: &str,
    ) -> Result<Conversation, DomainError> {
        self.check(StoreOperation::CreateConversation)?;
        let conversation = Conversation::new(owner_id.clone(), Some(title));
        let mut state = self.state.write().await;
        state.messages.insert(*conversation.id(), Vec::new());
        state
            .conversations
            .insert(*conversation.id(), conversation.clone());
        Ok(conversation)
    }

    async fn find_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, DomainError> {
        self.check(StoreOperation::FindConversation)?;
        Ok(self.state.read().await.conversations.get(id).cloned())
    }

    async fn list_conversations(
        &self,
        owner_id: &UserId,
    ) -> Result<Vec<ConversationSummary>, DomainError> {
        self.check(StoreOperation::ListConversations)?;
        let state = self.state.read().await;
        let mut summaries: Vec<ConversationSummary> = state
            .conversations
            .values()
            .filter(|c| c.owner_id() == owner_id)
            .map(|c| ConversationSummary {
                conversation: c.clone(),
                preview: state
                    .messages
                    .get(c.id())
                    .and_then(|m| m.iter().min_by_key(|m| m.position()))
                    .cloned(),
            })
            .collect();
        summaries.sort_by(|a, b| {
            b.conversation
                .updated_at()
                .cmp(a.conversation.updated_at())
        });
        Ok(summaries)
    }

    async fn rename_conversation(
        &self,
        id: &ConversationId,
        title: &str,
    ) -> Result<(), DomainError> {
        self.check(StoreOperation::RenameConversation)?;
        let mut state = self.state.write().await;
        state.conversation_mut(id)?.rename(title)
    }

    async fn delete_conversation(&self, id: &ConversationId) -> Result<(), DomainError> {
        self.check(StoreOperation::DeleteConversation)?;
        let mut state = self.state.write().await;
        if state.conversations.remove(id).is_none() {
            return Err(conversation_not_found(id));
        }
        state.messages.remove(id);
        Ok(())
    }

    async fn create_message(
        &self,
        conversation_id: &ConversationId,
        role: Role,
        content: &str,
    ) -> Result<Message, DomainError> {
        self.check(StoreOperation::CreateMessage)?;
        let mut state = self.state.write().await;
        state.conversation_mut(conversation_id)?.touch();

        let messages = state.messages.entry(*conversation_id).or_default();
        let position = messages
            .iter()
            .map(|m| m.position() + 1)
            .max()
            .unwrap_or(0);
        let message = Message::reconstitute(
            MessageId::new(),
            *conversation_id,
            role,
            content.to_string(),
            position,
            Timestamp::now(),
        );
        messages.push(message.clone());
        Ok(message)
    }

    async fn update_message_content(
        &self,
        message_id: &MessageId,
        content: &str,
    ) -> Result<(), DomainError> {
        self.check(StoreOperation::UpdateMessageContent)?;
        let mut state = self.state.write().await;
        let message = state
            .messages
            .values_mut()
            .flat_map(|m| m.iter_mut())
            .find(|m| m.id() == message_id)
            .ok_or_else(|| {
                DomainError::new(ErrorCode::MessageNotFound, "Message not found")
                    .with_detail("message_id", message_id.to_string())
            })?;
        message.replace_content(content.to_string());
        let conversation_id = *message.conversation_id();
        state.conversation_mut(&conversation_id)?.touch();
        Ok(())
    }

    async fn delete_messages_after(
        &self,
        conversation_id: &ConversationId,
        position: u32,
    ) -> Result<u64, DomainError> {
        self.check(StoreOperation::DeleteMessagesAfter)?;
        let mut state = self.state.write().await;
        let Some(messages) = state.messages.get_mut(conversation_id) else {
            return Ok(0);
        };
        let before = messages.len();
        messages.retain(|m| m.position() <= position);
        Ok((before - messages.len()) as u64)
    }

    async fn list_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, DomainError> {
        self.check(StoreOperation::ListMessages)?;
        let state = self.state.read().await;
        let mut messages = state
            .messages
            .get(conversation_id)
            .cloned()
            .unwrap_or_default();
        messages.sort_by(|a, b| {
            a.position()
                .cmp(&b.position())
                .then_with(|| a.created_at().cmp(b.created_at()))
        });
        Ok(messages)
    }
}

fn conversation_not_found(id: &ConversationId) -> DomainError {
    DomainError::new(ErrorCode::ConversationNotFound, "Conversation not found")
        .with_detail("conversation_id", id.to_string())
}
