//! Development seed data: one test user with a welcome chat.
//!
//! Runs against the ports, so it behaves the same on every store. Seeding is
//! skipped when the test user already exists.

use crate::application::ChatError;
use crate::domain::conversation::{Conversation, Role};
use crate::domain::foundation::{AuthenticatedUser, UserId};
use crate::domain::user::User;
use crate::ports::{ConversationStore, UserRepository};

pub const SEED_USER_ID: &str = "user_seed_test";
pub const SEED_EMAIL: &str = "test@example.com";
pub const SEED_NAME: &str = "Test User";
pub const SEED_CHAT_TITLE: &str = "Welcome Chat";

const SEED_MESSAGES: [(Role, &str); 3] = [
    (Role::Assistant, "Hello! How can I help you today?"),
    (Role::User, "Tell me about MongoDB and Prisma."),
    (
        Role::Assistant,
        "MongoDB is a NoSQL document database that stores data in JSON-like documents. \
         Prisma is a modern ORM (Object-Relational Mapping) tool that helps developers work \
         with databases using type-safe queries. Together, they provide a powerful combination \
         for building full-stack applications. Prisma simplifies database operations and \
         provides type safety, while MongoDB offers flexibility with JSON documents and \
         scalability for modern applications.",
    ),
];

/// Seeds the test user and welcome chat. Returns the chat when one was created.
pub async fn seed_demo_data(
    users: &dyn UserRepository,
    store: &dyn ConversationStore,
) -> Result<Option<Conversation>, ChatError> {
    if users.find_by_email(SEED_EMAIL).await?.is_some() {
        tracing::debug!(email = SEED_EMAIL, "seed user exists, skipping seed");
        return Ok(None);
    }

    let user_id = UserId::new(SEED_USER_ID).map_err(|e| ChatError::Internal(e.to_string()))?;
    let identity = AuthenticatedUser::new(user_id, SEED_EMAIL, Some(SEED_NAME.to_string()));
    let user = User::from_identity(&identity);
    users.save(&user).await?;

    let conversation = store.create_conversation(user.id(), SEED_CHAT_TITLE).await?;
    for (role, content) in SEED_MESSAGES {
        store.create_message(conversation.id(), role, content).await?;
    }

    tracing::info!(
        user_id = %user.id(),
        conversation_id = %conversation.id(),
        "seed data created"
    );
    Ok(Some(conversation))
}
