//! Error taxonomy surfaced by the chat application layer.

use thiserror::Error;

use crate::domain::foundation::{AuthError, DomainError, ErrorCode};
use crate::ports::CompletionError;

/// Errors returned by chat commands and queries.
///
/// `Unauthorized`, `NotFound`, `InvalidRole` and `Busy` end the request.
/// `ProviderFailure` leaves history intact and may be retried by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("authentication required")]
    Unauthorized,

    /// Absent, or owned by someone else.
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    #[error("only user messages can be edited")]
    InvalidRole,

    #[error("a response is already being generated for this conversation")]
    Busy,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("completion provider failed: {message}")]
    ProviderFailure { message: String, retryable: bool },

    #[error("persistence failed: {0}")]
    PersistenceFailure(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ChatError {
    pub fn not_found(resource: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    pub fn provider(message: impl Into<String>, retryable: bool) -> Self {
        Self::ProviderFailure {
            message: message.into(),
            retryable,
        }
    }

    /// Returns true if the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChatError::ProviderFailure { retryable: true, .. })
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::Unauthorized => "UNAUTHORIZED",
            ChatError::NotFound { .. } => "NOT_FOUND",
            ChatError::InvalidRole => "INVALID_ROLE",
            ChatError::Busy => "BUSY",
            ChatError::Validation(_) => "VALIDATION_FAILED",
            ChatError::ProviderFailure { .. } => "PROVIDER_FAILURE",
            ChatError::PersistenceFailure(_) => "PERSISTENCE_FAILURE",
            ChatError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<DomainError> for ChatError {
    fn from(err: DomainError) -> Self {
        let id = |key: &str| err.details.get(key).cloned().unwrap_or_default();
        match err.code {
            ErrorCode::ConversationNotFound => ChatError::not_found("Conversation", id("conversation_id")),
            ErrorCode::MessageNotFound => ChatError::not_found("Message", id("message_id")),
            ErrorCode::UserNotFound => ChatError::not_found("User", id("user_id")),
            ErrorCode::NotFound => ChatError::not_found("Resource", id("id")),
            ErrorCode::InvalidRole => ChatError::InvalidRole,
            ErrorCode::GenerationInFlight => ChatError::Busy,
            ErrorCode::ValidationFailed | ErrorCode::EmptyField | ErrorCode::InvalidFormat => {
                ChatError::Validation(err.message)
            }
            ErrorCode::Unauthorized => ChatError::Unauthorized,
            ErrorCode::DatabaseError => ChatError::PersistenceFailure(err.message),
            ErrorCode::InvalidStateTransition | ErrorCode::InternalError => {
                ChatError::Internal(err.message)
            }
        }
    }
}

impl From<CompletionError> for ChatError {
    fn from(err: CompletionError) -> Self {
        let retryable = err.is_retryable();
        ChatError::provider(err.to_string(), retryable)
    }
}

impl From<AuthError> for ChatError {
    fn from(_: AuthError) -> Self {
        ChatError::Unauthorized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod from_domain {
        use super::*;

        #[test]
        fn message_not_found_keeps_id() {
            let err = DomainError::new(ErrorCode::MessageNotFound, "gone")
                .with_detail("message_id", "m-1");
            assert_eq!(ChatError::from(err), ChatError::not_found("Message", "m-1"));
        }

        #[test]
        fn ownership_failure_is_not_found() {
            let err = DomainError::new(ErrorCode::NotFound, "Resource not found");
            assert!(matches!(ChatError::from(err), ChatError::NotFound { .. }));
        }

        #[test]
        fn generation_in_flight_is_busy() {
            let err = DomainError::new(ErrorCode::GenerationInFlight, "busy");
            assert_eq!(ChatError::from(err), ChatError::Busy);
        }

        #[test]
        fn database_error_is_persistence_failure() {
            let err = DomainError::new(ErrorCode::DatabaseError, "connection reset");
            assert_eq!(
                ChatError::from(err),
                ChatError::PersistenceFailure("connection reset".into())
            );
        }

        #[test]
        fn validation_keeps_message() {
            let err = DomainError::validation("content", "Field 'content' cannot be empty");
            assert_eq!(
                ChatError::from(err),
                ChatError::Validation("Field 'content' cannot be empty".into())
            );
        }
    }

    #[test]
    fn provider_errors_keep_retryability() {
        let transient: ChatError = CompletionError::network("reset").into();
        assert!(transient.is_retryable());

        let permanent: ChatError = CompletionError::AuthenticationFailed.into();
        assert!(!permanent.is_retryable());
        assert_eq!(permanent.code(), "PROVIDER_FAILURE");
    }

    #[test]
    fn only_provider_failures_are_retryable() {
        assert!(!ChatError::Busy.is_retryable());
        assert!(!ChatError::PersistenceFailure("x".into()).is_retryable());
    }

    #[test]
    fn display_names_the_resource() {
        assert_eq!(
            ChatError::not_found("Conversation", "c-9").to_string(),
            "Conversation not found: c-9"
        );
    }
}
