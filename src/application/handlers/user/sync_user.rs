//! SyncUserHandler - get-or-create the account for an authenticated identity.

use std::sync::Arc;

use crate::application::ChatError;
use crate::domain::foundation::AuthenticatedUser;
use crate::domain::user::User;
use crate::ports::UserRepository;

#[derive(Debug, Clone)]
pub struct SyncUserCommand {
    pub identity: AuthenticatedUser,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncUserResult {
    pub user: User,
    /// True if the account did not exist before this call.
    pub created: bool,
}

pub struct SyncUserHandler {
    users: Arc<dyn UserRepository>,
}

impl SyncUserHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn handle(&self, cmd: SyncUserCommand) -> Result<SyncUserResult, ChatError> {
        if let Some(user) = self.users.find_by_id(&cmd.identity.id).await? {
            return Ok(SyncUserResult {
                user,
                created: false,
            });
        }

        let user = User::from_identity(&cmd.identity);
        self.users.save(&user).await?;
        tracing::info!(user_id = %user.id(), "user account created");

        Ok(SyncUserResult {
            user,
            created: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryUserRepository;
    use crate::domain::foundation::UserId;

    fn identity() -> AuthenticatedUser {
        AuthenticatedUser::new(UserId::new("user_abc").unwrap(), "sam@example.com", None)
    }

    #[tokio::test]
    async fn first_sync_creates_account() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let handler = SyncUserHandler::new(repo.clone());

        let result = handler.handle(SyncUserCommand { identity: identity() }).await.unwrap();

        assert!(result.created);
        assert_eq!(result.user.name(), Some("sam"));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn later_syncs_return_existing() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let handler = SyncUserHandler::new(repo.clone());
        let first = handler.handle(SyncUserCommand { identity: identity() }).await.unwrap();

        let second = handler.handle(SyncUserCommand { identity: identity() }).await.unwrap();

        assert!(!second.created);
        assert_eq!(second.user, first.user);
        assert_eq!(repo.len().await, 1);
    }
}
