//! Completion provider port - interface for the text generation service.
//!
//! A provider receives the ordered message list of a conversation and answers
//! with a lazy stream of text chunks. The stream ends with a chunk whose
//! `finish_reason` is set, or with an error. A stream cannot be restarted: a
//! new call is a new generation.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::domain::conversation::{Message, Role};
use crate::domain::foundation::{ConversationId, UserId};

/// Stream of chunks produced by one generation.
pub type CompletionStream =
    Pin<Box<dyn Stream<Item = Result<CompletionChunk, CompletionError>> + Send>>;

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Start a generation for the given request.
    ///
    /// Errors returned here mean the provider refused or could not be
    /// reached. Failures after the first chunk arrive through the stream.
    async fn generate(&self, request: CompletionRequest) -> Result<CompletionStream, CompletionError>;

    /// Get provider information (name, model, capabilities).
    fn provider_info(&self) -> ProviderInfo;
}

/// Request for one generation turn.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Ordered prompt: system prompt first, then history oldest to newest.
    pub messages: Vec<PromptMessage>,
    pub max_tokens: Option<u32>,
    /// Temperature for response randomness (0.0 = deterministic, 1.0+ = creative).
    pub temperature: Option<f32>,
    pub metadata: RequestMetadata,
}

impl CompletionRequest {
    pub fn new(metadata: RequestMetadata) -> Self {
        Self {
            messages: Vec::new(),
            max_tokens: None,
            temperature: None,
            metadata,
        }
    }

    /// Builds a request from a conversation's history, optionally preceded
    /// by a system prompt. Blank history entries are skipped.
    pub fn from_history<'a>(
        metadata: RequestMetadata,
        system_prompt: Option<&str>,
        history: impl IntoIterator<Item = &'a Message>,
    ) -> Self {
        let mut request = Self::new(metadata);
        if let Some(prompt) = system_prompt.filter(|p| !p.trim().is_empty()) {
            request = request.with_message(Role::System, prompt);
        }
        for message in history {
            if !message.content().trim().is_empty() {
                request = request.with_message(message.role(), message.content());
            }
        }
        request
    }

    pub fn with_message(mut self, role: Role, content: impl Into<String>) -> Self {
        self.messages.push(PromptMessage::new(role, content));
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }
}

/// One entry of the prompt sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Request metadata for tracing.
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    pub user_id: UserId,
    pub conversation_id: ConversationId,
    /// Generation number within the conversation's session.
    pub generation: u64,
}

impl RequestMetadata {
    pub fn new(user_id: UserId, conversation_id: ConversationId, generation: u64) -> Self {
        Self {
            user_id,
            conversation_id,
            generation,
        }
    }
}

/// Reason the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop (end of response).
    Stop,
    /// Hit max_tokens limit.
    Length,
    /// Content was filtered for safety.
    ContentFilter,
}

/// Streaming chunk from a generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionChunk {
    /// New text in this chunk.
    pub delta: String,
    /// If present, generation is complete.
    pub finish_reason: Option<FinishReason>,
}

impl CompletionChunk {
    pub fn content(delta: impl Into<String>) -> Self {
        Self {
            delta: delta.into(),
            finish_reason: None,
        }
    }

    /// The end marker of a stream.
    pub fn final_chunk(finish_reason: FinishReason) -> Self {
        Self {
            delta: String::new(),
            finish_reason: Some(finish_reason),
        }
    }

    pub fn is_final(&self) -> bool {
        self.finish_reason.is_some()
    }
}

/// Provider information and capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Provider name (e.g., "openai").
    pub name: String,
    /// Model identifier (e.g., "o3-mini").
    pub model: String,
    pub supports_streaming: bool,
}

impl ProviderInfo {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            supports_streaming: true,
        }
    }
}

/// Completion provider errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionError {
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u32 },

    /// Prompt plus history exceeds the model limit.
    #[error("context too long: {0}")]
    ContextTooLong(String),

    #[error("content filtered: {reason}")]
    ContentFiltered { reason: String },

    #[error("provider unavailable: {message}")]
    Unavailable { message: String },

    /// API key rejected.
    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("network error: {0}")]
    Network(String),

    /// Failed to parse provider response.
    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u32 },

    /// Stream closed without an end marker.
    #[error("stream ended unexpectedly")]
    Disconnected,
}

impl CompletionError {
    pub fn rate_limited(retry_after_secs: u32) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    pub fn content_filtered(reason: impl Into<String>) -> Self {
        Self::ContentFiltered {
            reason: reason.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Returns true if asking again later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CompletionError::RateLimited { .. }
                | CompletionError::Unavailable { .. }
                | CompletionError::Network(_)
                | CompletionError::Timeout { .. }
                | CompletionError::Disconnected
        )
    }
}
