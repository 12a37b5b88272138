//! Conversation store port.
//!
//! Durable, ordered message log per conversation plus the conversation
//! records themselves. Positions are assigned by the store: a new message
//! always lands one past the highest existing position.
//!
//! Deleting a conversation removes its messages with it.

use crate::domain::conversation::{Conversation, ConversationSummary, Message, Role};
use crate::domain::foundation::{ConversationId, DomainError, MessageId, UserId};
use async_trait::async_trait;

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Create a conversation owned by `owner_id`.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn create_conversation(
        &self,
        owner_id: &UserId,
        title: &str,
    ) -> Result<Conversation, DomainError>;

    /// Find a conversation by its ID. Returns `None` if not found.
    async fn find_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, DomainError>;

    /// All conversations of a user, most recently updated first, each with
    /// its earliest message as preview.
    async fn list_conversations(
        &self,
        owner_id: &UserId,
    ) -> Result<Vec<ConversationSummary>, DomainError>;

    /// Store a new title and bump `updated_at`.
    ///
    /// # Errors
    ///
    /// - `ConversationNotFound` if the conversation doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn rename_conversation(&self, id: &ConversationId, title: &str)
        -> Result<(), DomainError>;

    /// Delete a conversation and all of its messages.
    ///
    /// # Errors
    ///
    /// - `ConversationNotFound` if the conversation doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn delete_conversation(&self, id: &ConversationId) -> Result<(), DomainError>;

    /// Append a message at the next free position.
    ///
    /// # Errors
    ///
    /// - `ConversationNotFound` if the conversation doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn create_message(
        &self,
        conversation_id: &ConversationId,
        role: Role,
        content: &str,
    ) -> Result<Message, DomainError>;

    /// Replace the content of an existing message.
    ///
    /// # Errors
    ///
    /// - `MessageNotFound` if the message doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update_message_content(
        &self,
        message_id: &MessageId,
        content: &str,
    ) -> Result<(), DomainError>;

    /// Delete every message whose position is strictly greater than
    /// `position`. Returns how many were deleted.
    async fn delete_messages_after(
        &self,
        conversation_id: &ConversationId,
        position: u32,
    ) -> Result<u64, DomainError>;

    /// All messages of a conversation in chronological order.
    async fn list_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, DomainError>;
}
