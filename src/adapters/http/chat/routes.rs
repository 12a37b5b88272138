//! HTTP routes for chat endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};

use super::handlers::{
    create_chat, delete_chat, edit_message, get_chat, list_chats, rename_chat, submit_message,
    ChatHandlers,
};

/// Creates the chat router. Paths are relative to `/api`.
pub fn chat_routes(handlers: ChatHandlers) -> Router {
    Router::new()
        .route("/chat", post(submit_message))
        .route("/chats", get(list_chats).post(create_chat))
        .route(
            "/chats/:id",
            get(get_chat).put(rename_chat).delete(delete_chat),
        )
        .route("/chats/:id/messages/:message_id", put(edit_message))
        .with_state(handlers)
}
