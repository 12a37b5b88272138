//! HTTP adapter for chat endpoints: conversations and streamed turns.

mod dto;
mod handlers;
mod routes;
mod sse;

pub use dto::{
    ChatDetailResponse, ChatResponse, ChatSummaryResponse, CreateChatRequest, EditMessageRequest,
    MessageResponse, RenameChatRequest, SubmitMessageRequest, TurnStarted,
};
pub use handlers::ChatHandlers;
pub use routes::chat_routes;
pub use sse::{sse_event, turn_stream};
