//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `ConversationStore` - durable conversation and message log
//! - `UserRepository` - user accounts
//! - `CompletionProvider` - streaming text generation
//! - `SessionValidator` - bearer token validation

mod completion_provider;
mod conversation_store;
mod session_validator;
mod user_repository;

pub use completion_provider::{
    CompletionChunk, CompletionError, CompletionProvider, CompletionRequest, CompletionStream,
    FinishReason, PromptMessage, ProviderInfo, RequestMetadata,
};
pub use conversation_store::ConversationStore;
pub use session_validator::SessionValidator;
pub use user_repository::UserRepository;
