//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod chat;
pub mod conversation;
pub mod user;

pub use chat::{
    EditMessageCommand, EditMessageHandler, EditMessageResult, SubmitMessageCommand,
    SubmitMessageHandler, SubmitMessageResult,
};
pub use conversation::{
    ConversationView, CreateConversationCommand, CreateConversationHandler,
    DeleteConversationCommand, DeleteConversationHandler, GetConversationHandler,
    GetConversationQuery, ListConversationsHandler, ListConversationsQuery,
    RenameConversationCommand, RenameConversationHandler,
};
pub use user::{
    CurrentUserView, GetCurrentUserHandler, GetCurrentUserQuery, SyncUserCommand, SyncUserHandler,
    SyncUserResult, UpdateProfileCommand, UpdateProfileHandler,
};

use crate::application::ChatError;
use crate::domain::conversation::Conversation;
use crate::domain::foundation::{ConversationId, OwnedByUser, UserId};
use crate::ports::ConversationStore;

/// Loads a conversation the user owns. Missing and foreign conversations are
/// indistinguishable to the caller.
pub(crate) async fn load_owned_conversation(
    store: &dyn ConversationStore,
    id: &ConversationId,
    user_id: &UserId,
) -> Result<Conversation, ChatError> {
    let conversation = store
        .find_conversation(id)
        .await?
        .ok_or_else(|| ChatError::not_found("Conversation", id))?;
    conversation
        .check_ownership(user_id)
        .map_err(|_| ChatError::not_found("Conversation", id))?;
    Ok(conversation)
}
