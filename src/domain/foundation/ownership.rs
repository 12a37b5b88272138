//! Ownership trait for user-owned resources.
//!
//! A caller who does not own a resource is told it does not exist, so
//! conversation identifiers cannot be probed across accounts.

use super::{DomainError, ErrorCode, UserId};

/// Trait for aggregates that have a single owner.
pub trait OwnedByUser {
    /// Returns the ID of the user who owns this resource.
    fn owner_id(&self) -> &UserId;

    fn is_owner(&self, user_id: &UserId) -> bool {
        self.owner_id() == user_id
    }

    /// Validates ownership, returning a `NotFound` error for anyone else.
    fn check_ownership(&self, user_id: &UserId) -> Result<(), DomainError> {
        if self.is_owner(user_id) {
            Ok(())
        } else {
            Err(DomainError::new(ErrorCode::NotFound, "Resource not found")
                .with_detail("requested_by", user_id.to_string()))
        }
    }
}
