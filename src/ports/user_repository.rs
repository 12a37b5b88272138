//! User repository port.

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::user::User;
use async_trait::async_trait;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, DomainError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;

    /// Insert the user, or overwrite the stored record with the same id.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure, including an email that
    ///   already belongs to a different id
    async fn save(&self, user: &User) -> Result<(), DomainError>;
}
