//! Conversation aggregate entity.
//!
//! A conversation is a titled, owned chat. Its messages are held separately,
//! by the store and by an open `ConversationSession`.

use crate::domain::foundation::{
    ConversationId, DomainError, OwnedByUser, Timestamp, UserId, ValidationError,
};

use super::message::Message;

use serde::{Deserialize, Serialize};

/// Title used when nothing better is available.
pub const DEFAULT_TITLE: &str = "New Chat";

/// Characters of the first message kept when it becomes the title.
pub const TITLE_PREVIEW_CHARS: usize = 30;

pub const MAX_TITLE_LENGTH: usize = 200;

/// Conversation aggregate.
///
/// # Invariants
///
/// - `owner_id` is immutable
/// - `title` is never blank
/// - `updated_at >= created_at`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    owner_id: UserId,
    title: String,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Conversation {
    /// Creates a new conversation. A blank or missing title becomes `DEFAULT_TITLE`.
    pub fn new(owner_id: UserId, title: Option<&str>) -> Self {
        let now = Timestamp::now();
        Self {
            id: ConversationId::new(),
            owner_id,
            title: resolve_title(title),
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstitutes a conversation from persistence (no validation).
    pub fn reconstitute(
        id: ConversationId,
        owner_id: UserId,
        title: String,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            owner_id,
            title,
            created_at,
            updated_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub fn owner_id(&self) -> &UserId {
        &self.owner_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    /// Renames the conversation.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the title is blank or longer than `MAX_TITLE_LENGTH`
    pub fn rename(&mut self, title: &str) -> Result<(), DomainError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::empty_field("title").into());
        }
        let length = title.chars().count();
        if length > MAX_TITLE_LENGTH {
            return Err(ValidationError::too_long("title", MAX_TITLE_LENGTH, length).into());
        }

        self.title = title.to_string();
        self.touch();
        Ok(())
    }

    /// Marks the conversation as changed now.
    pub fn touch(&mut self) {
        let now = Timestamp::now();
        if now.is_after(&self.updated_at) {
            self.updated_at = now;
        }
    }
}

impl OwnedByUser for Conversation {
    fn owner_id(&self) -> &UserId {
        &self.owner_id
    }
}

/// Conversation with the first message of its history, for list views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub conversation: Conversation,
    pub preview: Option<Message>,
}

/// Title for a newly created conversation.
pub fn resolve_title(title: Option<&str>) -> String {
    title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| truncate_chars(t, MAX_TITLE_LENGTH))
        .unwrap_or_else(|| DEFAULT_TITLE.to_string())
}

/// First `TITLE_PREVIEW_CHARS` characters of the message, or `DEFAULT_TITLE`.
pub fn title_from_first_message(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return DEFAULT_TITLE.to_string();
    }
    truncate_chars(trimmed, TITLE_PREVIEW_CHARS)
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    fn owner() -> UserId {
        UserId::new("user-1").unwrap()
    }

    mod creation {
        use super::*;

        #[test]
        fn missing_title_defaults() {
            let conversation = Conversation::new(owner(), None);
            assert_eq!(conversation.title(), DEFAULT_TITLE);
            assert_eq!(conversation.created_at(), conversation.updated_at());
        }

        #[test]
        fn blank_title_defaults() {
            assert_eq!(Conversation::new(owner(), Some("   ")).title(), DEFAULT_TITLE);
        }

        #[test]
        fn explicit_title_is_trimmed() {
            assert_eq!(Conversation::new(owner(), Some("  Trip plans ")).title(), "Trip plans");
        }

        #[test]
        fn resolve_title_caps_length() {
            let title = resolve_title(Some(&"a".repeat(MAX_TITLE_LENGTH + 50)));
            assert_eq!(title.chars().count(), MAX_TITLE_LENGTH);
        }
    }

    mod title_from_first_message {
        use super::*;

        #[test]
        fn long_message_is_cut_to_preview_length() {
            let title = title_from_first_message("Explain the borrow checker to me like I'm five");
            assert_eq!(title, "Explain the borrow checker to ");
            assert_eq!(title.chars().count(), TITLE_PREVIEW_CHARS);
        }

        #[test]
        fn short_message_kept_whole() {
            assert_eq!(title_from_first_message("hi"), "hi");
        }

        #[test]
        fn multibyte_text_is_cut_on_char_boundary() {
            let title = title_from_first_message(&"日本語".repeat(20));
            assert_eq!(title.chars().count(), TITLE_PREVIEW_CHARS);
        }

        #[test]
        fn blank_message_defaults() {
            assert_eq!(title_from_first_message(""), DEFAULT_TITLE);
        }
    }

    mod rename {
        use super::*;

        #[test]
        fn rename_updates_title_and_touches() {
            let mut conversation = Conversation::new(owner(), None);
            let before = *conversation.updated_at();

            conversation.rename(" Recipes ").unwrap();

            assert_eq!(conversation.title(), "Recipes");
            assert!(conversation.updated_at() >= &before);
        }

        #[test]
        fn rename_rejects_blank() {
            let mut conversation = Conversation::new(owner(), Some("Keep"));
            let err = conversation.rename("  ").unwrap_err();
            assert_eq!(err.code, ErrorCode::ValidationFailed);
            assert_eq!(conversation.title(), "Keep");
        }

        #[test]
        fn rename_rejects_overlong() {
            let mut conversation = Conversation::new(owner(), None);
            assert!(conversation.rename(&"t".repeat(MAX_TITLE_LENGTH + 1)).is_err());
        }
    }

    #[test]
    fn ownership_is_checked_against_owner() {
        let conversation = Conversation::new(owner(), None);
        assert!(conversation.check_ownership(&owner()).is_ok());

        let stranger = UserId::new("user-2").unwrap();
        assert_eq!(
            conversation.check_ownership(&stranger).unwrap_err().code,
            ErrorCode::NotFound
        );
    }
}
