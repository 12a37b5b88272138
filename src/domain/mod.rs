//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, identity, errors)
//! - `conversation` - Conversations, messages and the live conversation session
//! - `user` - User accounts

pub mod conversation;
pub mod foundation;
pub mod user;
