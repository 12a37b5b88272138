//! In-memory adapters for tests and local development.

mod conversation_store;
mod user_repository;

pub use conversation_store::{InMemoryConversationStore, StoreOperation};
pub use user_repository::InMemoryUserRepository;
