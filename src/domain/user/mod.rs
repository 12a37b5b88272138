//! User module - accounts mirrored from the identity provider.

mod account;

pub use account::{User, MAX_NAME_LENGTH};
