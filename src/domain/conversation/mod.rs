//! Conversation domain module.
//!
//! Conversations, their messages, and the in-memory session that keeps the
//! displayed history consistent with the persisted one while replies stream
//! in and edits rewrite the tail.

mod aggregate;
mod message;
mod session;
mod state;

pub use aggregate::{
    resolve_title, title_from_first_message, Conversation, ConversationSummary, DEFAULT_TITLE,
    MAX_TITLE_LENGTH, TITLE_PREVIEW_CHARS,
};
pub use message::{validate_content, Message, Role, MAX_CONTENT_LENGTH};
pub use session::{ChunkOutcome, ConversationSession, SessionSnapshot, StreamEnd};
pub use state::{Generation, StreamState};
