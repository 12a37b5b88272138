//! UpdateProfileHandler - Command handler for name and avatar changes.

use std::sync::Arc;

use crate::application::ChatError;
use crate::domain::foundation::UserId;
use crate::domain::user::User;
use crate::ports::UserRepository;

#[derive(Debug, Clone)]
pub struct UpdateProfileCommand {
    pub user_id: UserId,
    pub name: Option<String>,
    /// An empty string clears the image.
    pub image: Option<String>,
}

pub struct UpdateProfileHandler {
    users: Arc<dyn UserRepository>,
}

impl UpdateProfileHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn handle(&self, cmd: UpdateProfileCommand) -> Result<User, ChatError> {
        // 1. Load
        let mut user = self
            .users
            .find_by_id(&cmd.user_id)
            .await?
            .ok_or_else(|| ChatError::not_found("User", &cmd.user_id))?;

        // 2. Apply
        user.update_profile(cmd.name.as_deref(), cmd.image.as_deref())?;

        // 3. Persist
        self.users.save(&user).await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryUserRepository;
    use crate::domain::foundation::AuthenticatedUser;

    async fn setup() -> (Arc<InMemoryUserRepository>, UserId) {
        let repo = Arc::new(InMemoryUserRepository::new());
        let id = UserId::new("user-1").unwrap();
        let identity = AuthenticatedUser::new(id.clone(), "kim@example.com", None)
            .with_image_url("https://img.example.com/kim.png");
        repo.save(&User::from_identity(&identity)).await.unwrap();
        (repo, id)
    }

    #[tokio::test]
    async fn updates_name_and_clears_image() {
        let (repo, id) = setup().await;
        let handler = UpdateProfileHandler::new(repo.clone());

        let user = handler
            .handle(UpdateProfileCommand {
                user_id: id.clone(),
                name: Some("Kim".into()),
                image: Some(String::new()),
            })
            .await
            .unwrap();

        assert_eq!(user.name(), Some("Kim"));
        assert_eq!(user.image(), None);
        assert_eq!(repo.find_by_id(&id).await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let (repo, id) = setup().await;
        let handler = UpdateProfileHandler::new(repo.clone());

        let err = handler
            .handle(UpdateProfileCommand {
                user_id: id.clone(),
                name: Some(" ".into()),
                image: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::Validation(_)));
        let stored = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.name(), Some("kim"));
    }
}
