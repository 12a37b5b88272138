//! HTTP adapters - REST and SSE endpoints.
//!
//! - `chat` - conversations and streamed turns
//! - `user` - account sync and profile
//! - `middleware` - bearer authentication

pub mod chat;
mod error;
pub mod middleware;
mod router;
pub mod user;

pub use error::{handle_chat_error, status_for, ErrorResponse};
pub use router::{api_router, cors_layer, health, with_http_layers, Services};
