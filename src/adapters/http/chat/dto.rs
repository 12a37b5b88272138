//! HTTP DTOs for chat endpoints.
//!
//! Field names are camelCase on the wire.

use serde::{Deserialize, Serialize};

use crate::application::handlers::ConversationView;
use crate::application::ChatError;
use crate::domain::conversation::{
    Conversation, ConversationSummary, Generation, Message, Role, StreamState,
};

// ════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════

/// Body of `POST /api/chat`. Without a `chatId` a new conversation is created.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitMessageRequest {
    #[serde(default)]
    pub chat_id: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditMessageRequest {
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateChatRequest {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenameChatRequest {
    pub title: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListChatsParams {
    #[serde(default)]
    pub limit: Option<usize>,
}

// ════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: String,
    pub chat_id: String,
    pub role: Role,
    pub content: String,
    pub position: u32,
    pub created_at: String,
}

impl From<&Message> for MessageResponse {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id().to_string(),
            chat_id: message.conversation_id().to_string(),
            role: message.role(),
            content: message.content().to_string(),
            position: message.position(),
            created_at: message.created_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Conversation> for ChatResponse {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id().to_string(),
            title: conversation.title().to_string(),
            created_at: conversation.created_at().to_rfc3339(),
            updated_at: conversation.updated_at().to_rfc3339(),
        }
    }
}

/// List entry: the chat plus its first message, if any.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummaryResponse {
    #[serde(flatten)]
    pub chat: ChatResponse,
    pub preview: Option<MessageResponse>,
}

impl From<&ConversationSummary> for ChatSummaryResponse {
    fn from(summary: &ConversationSummary) -> Self {
        Self {
            chat: ChatResponse::from(&summary.conversation),
            preview: summary.preview.as_ref().map(MessageResponse::from),
        }
    }
}

/// A chat with its full ordered history and the state of its current turn.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatDetailResponse {
    #[serde(flatten)]
    pub chat: ChatResponse,
    pub messages: Vec<MessageResponse>,
    pub state: StreamState,
    pub generation: Generation,
}

impl From<&ConversationView> for ChatDetailResponse {
    fn from(view: &ConversationView) -> Self {
        Self {
            chat: ChatResponse::from(&view.conversation),
            messages: view.messages.iter().map(MessageResponse::from).collect(),
            state: view.state,
            generation: view.generation,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SSE payloads
// ════════════════════════════════════════════════════════════════════════════

/// First event of every turn stream.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnStarted {
    pub chat: ChatResponse,
    pub generation: Generation,
    /// The submitted or edited user message.
    pub message: MessageResponse,
    /// True when the submit created the conversation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<bool>,
    /// Messages discarded by an edit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkPayload {
    pub generation: Generation,
    pub message_id: String,
    pub delta: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedPayload {
    pub generation: Generation,
    pub message: MessageResponse,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedPayload {
    pub generation: Generation,
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl FailedPayload {
    pub fn new(generation: Generation, error: &ChatError) -> Self {
        Self {
            generation,
            code: error.code().to_string(),
            message: error.to_string(),
            retryable: error.is_retryable(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SupersededPayload {
    pub generation: Generation,
}
