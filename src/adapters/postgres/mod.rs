//! PostgreSQL adapters - Database implementations for store ports.
//!
//! - `PostgresConversationStore` - conversations and their ordered messages
//! - `PostgresUserRepository` - user accounts

mod conversation_store;
mod user_repository;

pub use conversation_store::PostgresConversationStore;
pub use user_repository::PostgresUserRepository;
