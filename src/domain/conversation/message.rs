//! Message entity for conversations.
//!
//! A message is one turn of a chat: who said it, what was said, and where it
//! sits in the conversation's order. Content only changes through the edit
//! path or while an assistant reply is still streaming in.

use crate::domain::foundation::{ConversationId, DomainError, MessageId, Timestamp, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest message content accepted from a user.
pub const MAX_CONTENT_LENGTH: usize = 10_000;

/// Role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// System instructions (typically invisible to user).
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(ValidationError::invalid_format(
                "role",
                format!("unknown role '{}'", other),
            )),
        }
    }
}

/// A message within a conversation.
///
/// # Invariants
///
/// - `role` never changes after construction
/// - `position` is unique within the owning conversation
/// - `content` is non-blank, except for a streaming placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    conversation_id: ConversationId,
    role: Role,
    content: String,
    /// Zero-based index in the conversation's chronological order.
    position: u32,
    created_at: Timestamp,
}

impl Message {
    /// Creates a new message with the given role and content.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if content is blank or longer than `MAX_CONTENT_LENGTH`
    pub fn new(
        conversation_id: ConversationId,
        role: Role,
        content: impl Into<String>,
        position: u32,
    ) -> Result<Self, DomainError> {
        let content = content.into();
        validate_content(&content)?;

        Ok(Self {
            id: MessageId::new(),
            conversation_id,
            role,
            content,
            position,
            created_at: Timestamp::now(),
        })
    }

    /// Empty assistant message that a streaming reply is assembled into.
    pub(crate) fn placeholder(conversation_id: ConversationId, position: u32) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            role: Role::Assistant,
            content: String::new(),
            position,
            created_at: Timestamp::now(),
        }
    }

    /// Reconstitutes a message from persistence (no validation).
    pub fn reconstitute(
        id: MessageId,
        conversation_id: ConversationId,
        role: Role,
        content: String,
        position: u32,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            conversation_id,
            role,
            content,
            position,
            created_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation (session only)
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) fn push_content(&mut self, delta: &str) {
        self.content.push_str(delta);
    }

    pub(crate) fn replace_content(&mut self, content: String) {
        self.content = content;
    }
}

/// Checks content submitted by a user or produced by an edit.
pub fn validate_content(content: &str) -> Result<(), DomainError> {
    if content.trim().is_empty() {
        return Err(ValidationError::empty_field("content").into());
    }
    let length = content.chars().count();
    if length > MAX_CONTENT_LENGTH {
        return Err(ValidationError::too_long("content", MAX_CONTENT_LENGTH, length).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    fn conversation() -> ConversationId {
        ConversationId::new()
    }

    mod role {
        use super::*;

        #[test]
        fn serializes_to_snake_case() {
            let json = serde_json::to_string(&Role::Assistant).unwrap();
            assert_eq!(json, "\"assistant\"");
        }

        #[test]
        fn parses_stored_strings() {
            assert_eq!("user".parse::<Role>().unwrap(), Role::User);
            assert_eq!("system".parse::<Role>().unwrap(), Role::System);
            assert!("moderator".parse::<Role>().is_err());
        }
    }

    mod construction {
        use super::*;

        #[test]
        fn new_keeps_role_and_position() {
            let msg = Message::new(conversation(), Role::User, "Hello", 3).unwrap();
            assert!(msg.is_user());
            assert_eq!(msg.content(), "Hello");
            assert_eq!(msg.position(), 3);
        }

        #[test]
        fn rejects_whitespace_only_content() {
            let err = Message::new(conversation(), Role::User, "  \n ", 0).unwrap_err();
            assert_eq!(err.code, ErrorCode::ValidationFailed);
        }

        #[test]
        fn rejects_oversized_content() {
            let content = "x".repeat(MAX_CONTENT_LENGTH + 1);
            assert!(Message::new(conversation(), Role::User, content, 0).is_err());
        }

        #[test]
        fn accepts_content_at_the_limit() {
            let content = "é".repeat(MAX_CONTENT_LENGTH);
            assert!(Message::new(conversation(), Role::User, content, 0).is_ok());
        }

        #[test]
        fn placeholder_is_empty_assistant() {
            let msg = Message::placeholder(conversation(), 1);
            assert!(msg.is_assistant());
            assert!(msg.content().is_empty());
        }
    }

    mod mutation {
        use super::*;

        #[test]
        fn push_content_appends() {
            let mut msg = Message::placeholder(conversation(), 1);
            msg.push_content("Hel");
            msg.push_content("lo!");
            assert_eq!(msg.content(), "Hello!");
        }

        #[test]
        fn replace_content_keeps_identity() {
            let mut msg = Message::new(conversation(), Role::User, "old", 0).unwrap();
            let id = *msg.id();
            msg.replace_content("new".to_string());
            assert_eq!(msg.id(), &id);
            assert_eq!(msg.content(), "new");
        }
    }
}
