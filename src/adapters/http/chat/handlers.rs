//! HTTP handlers for chat endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::adapters::http::error::{handle_chat_error, invalid_id};
use crate::adapters::http::middleware::RequireAuth;
use crate::application::handlers::{
    CreateConversationCommand, CreateConversationHandler, DeleteConversationCommand,
    DeleteConversationHandler, EditMessageCommand, EditMessageHandler, GetConversationHandler,
    GetConversationQuery, ListConversationsHandler, ListConversationsQuery,
    RenameConversationCommand, RenameConversationHandler, SubmitMessageCommand,
    SubmitMessageHandler,
};
use crate::domain::foundation::{ConversationId, MessageId};

use super::dto::{
    ChatDetailResponse, ChatResponse, ChatSummaryResponse, CreateChatRequest, EditMessageRequest,
    ListChatsParams, MessageResponse, RenameChatRequest, SubmitMessageRequest, TurnStarted,
};
use super::sse::turn_stream;

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct ChatHandlers {
    submit_handler: Arc<SubmitMessageHandler>,
    edit_handler: Arc<EditMessageHandler>,
    create_handler: Arc<CreateConversationHandler>,
    get_handler: Arc<GetConversationHandler>,
    list_handler: Arc<ListConversationsHandler>,
    rename_handler: Arc<RenameConversationHandler>,
    delete_handler: Arc<DeleteConversationHandler>,
}

impl ChatHandlers {
    pub fn new(
        submit_handler: Arc<SubmitMessageHandler>,
        edit_handler: Arc<EditMessageHandler>,
        create_handler: Arc<CreateConversationHandler>,
        get_handler: Arc<GetConversationHandler>,
        list_handler: Arc<ListConversationsHandler>,
        rename_handler: Arc<RenameConversationHandler>,
        delete_handler: Arc<DeleteConversationHandler>,
    ) -> Self {
        Self {
            submit_handler,
            edit_handler,
            create_handler,
            get_handler,
            list_handler,
            rename_handler,
            delete_handler,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Turns
// ════════════════════════════════════════════════════════════════════════════

/// POST /api/chat - Submit a message and stream the reply
pub async fn submit_message(
    State(handlers): State<ChatHandlers>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<SubmitMessageRequest>,
) -> Response {
    let conversation_id = match req.chat_id.as_deref() {
        Some(raw) => match raw.parse::<ConversationId>() {
            Ok(id) => Some(id),
            Err(_) => return invalid_id("chat"),
        },
        None => None,
    };

    let cmd = SubmitMessageCommand {
        user_id: user.id,
        conversation_id,
        content: req.content,
    };

    match handlers.submit_handler.handle(cmd).await {
        Ok(result) => {
            let started = TurnStarted {
                chat: ChatResponse::from(&result.conversation),
                generation: result.turn.generation,
                message: MessageResponse::from(&result.user_message),
                created: Some(result.created),
                removed: None,
            };
            turn_stream(started, result.turn).into_response()
        }
        Err(e) => handle_chat_error(e),
    }
}

/// PUT /api/chats/:id/messages/:message_id - Edit a user message and regenerate
pub async fn edit_message(
    State(handlers): State<ChatHandlers>,
    RequireAuth(user): RequireAuth,
    Path((chat_id, message_id)): Path<(String, String)>,
    Json(req): Json<EditMessageRequest>,
) -> Response {
    let Ok(conversation_id) = chat_id.parse::<ConversationId>() else {
        return invalid_id("chat");
    };
    let Ok(message_id) = message_id.parse::<MessageId>() else {
        return invalid_id("message");
    };

    let cmd = EditMessageCommand {
        user_id: user.id,
        conversation_id,
        message_id,
        content: req.content,
    };

    match handlers.edit_handler.handle(cmd).await {
        Ok(result) => {
            let started = TurnStarted {
                chat: ChatResponse::from(&result.conversation),
                generation: result.turn.generation,
                message: MessageResponse::from(&result.edited),
                created: None,
                removed: Some(result.removed),
            };
            turn_stream(started, result.turn).into_response()
        }
        Err(e) => handle_chat_error(e),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Conversations
// ════════════════════════════════════════════════════════════════════════════

/// GET /api/chats - List the user's chats, most recent first
pub async fn list_chats(
    State(handlers): State<ChatHandlers>,
    RequireAuth(user): RequireAuth,
    Query(params): Query<ListChatsParams>,
) -> Response {
    let query = ListConversationsQuery {
        user_id: user.id,
        limit: params.limit,
    };

    match handlers.list_handler.handle(query).await {
        Ok(summaries) => {
            let response: Vec<ChatSummaryResponse> =
                summaries.iter().map(ChatSummaryResponse::from).collect();
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => handle_chat_error(e),
    }
}

/// POST /api/chats - Create an empty chat
pub async fn create_chat(
    State(handlers): State<ChatHandlers>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<CreateChatRequest>,
) -> Response {
    let cmd = CreateConversationCommand {
        user_id: user.id,
        title: req.title,
    };

    match handlers.create_handler.handle(cmd).await {
        Ok(conversation) => {
            (StatusCode::CREATED, Json(ChatResponse::from(&conversation))).into_response()
        }
        Err(e) => handle_chat_error(e),
    }
}

/// GET /api/chats/:id - Chat with its ordered messages
pub async fn get_chat(
    State(handlers): State<ChatHandlers>,
    RequireAuth(user): RequireAuth,
    Path(chat_id): Path<String>,
) -> Response {
    let Ok(conversation_id) = chat_id.parse::<ConversationId>() else {
        return invalid_id("chat");
    };

    let query = GetConversationQuery {
        user_id: user.id,
        conversation_id,
    };

    match handlers.get_handler.handle(query).await {
        Ok(view) => (StatusCode::OK, Json(ChatDetailResponse::from(&view))).into_response(),
        Err(e) => handle_chat_error(e),
    }
}

/// PUT /api/chats/:id - Rename a chat
pub async fn rename_chat(
    State(handlers): State<ChatHandlers>,
    RequireAuth(user): RequireAuth,
    Path(chat_id): Path<String>,
    Json(req): Json<RenameChatRequest>,
) -> Response {
    let Ok(conversation_id) = chat_id.parse::<ConversationId>() else {
        return invalid_id("chat");
    };

    let cmd = RenameConversationCommand {
        user_id: user.id,
        conversation_id,
        title: req.title,
    };

    match handlers.rename_handler.handle(cmd).await {
        Ok(conversation) => (StatusCode::OK, Json(ChatResponse::from(&conversation))).into_response(),
        Err(e) => handle_chat_error(e),
    }
}

/// DELETE /api/chats/:id - Delete a chat and its messages
pub async fn delete_chat(
    State(handlers): State<ChatHandlers>,
    RequireAuth(user): RequireAuth,
    Path(chat_id): Path<String>,
) -> Response {
    let Ok(conversation_id) = chat_id.parse::<ConversationId>() else {
        return invalid_id("chat");
    };

    let cmd = DeleteConversationCommand {
        user_id: user.id,
        conversation_id,
    };

    match handlers.delete_handler.handle(cmd).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => handle_chat_error(e),
    }
}
