//! Conversation command and query handlers.
//!
//! Create, read, list, rename and delete. Turns are handled in `chat`.

mod create_conversation;
mod delete_conversation;
mod get_conversation;
mod list_conversations;
mod rename_conversation;

pub use create_conversation::{CreateConversationCommand, CreateConversationHandler};
pub use delete_conversation::{DeleteConversationCommand, DeleteConversationHandler};
pub use get_conversation::{ConversationView, GetConversationHandler, GetConversationQuery};
pub use list_conversations::{ListConversationsHandler, ListConversationsQuery};
pub use rename_conversation::{RenameConversationCommand, RenameConversationHandler};
