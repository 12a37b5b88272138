//! User account mirrored from the identity provider.

use crate::domain::foundation::{AuthenticatedUser, DomainError, Timestamp, UserId, ValidationError};
use serde::{Deserialize, Serialize};

/// Longest display name accepted on profile updates.
pub const MAX_NAME_LENGTH: usize = 100;

/// A chat user.
///
/// The identifier is the identity provider's subject, so accounts are created
/// lazily the first time an authenticated user syncs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    email: String,
    name: Option<String>,
    image: Option<String>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl User {
    /// Creates an account from a validated identity.
    ///
    /// Without a display name the local part of the email is used.
    pub fn from_identity(identity: &AuthenticatedUser) -> Self {
        let now = Timestamp::now();
        Self {
            id: identity.id.clone(),
            email: identity.email.clone(),
            name: Some(identity.display_name_or_local_part().to_string()),
            image: identity.image_url.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstitutes a user from persistence (no validation).
    pub fn reconstitute(
        id: UserId,
        email: String,
        name: Option<String>,
        image: Option<String>,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            email,
            name,
            image,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    /// Applies a profile update. `None` leaves a field unchanged.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the name is blank or longer than `MAX_NAME_LENGTH`
    pub fn update_profile(
        &mut self,
        name: Option<&str>,
        image: Option<&str>,
    ) -> Result<(), DomainError> {
        if let Some(name) = name {
            let name = name.trim();
            if name.is_empty() {
                return Err(ValidationError::empty_field("name").into());
            }
            let length = name.chars().count();
            if length > MAX_NAME_LENGTH {
                return Err(ValidationError::too_long("name", MAX_NAME_LENGTH, length).into());
            }
            self.name = Some(name.to_string());
        }
        if let Some(image) = image {
            let image = image.trim();
            self.image = (!image.is_empty()).then(|| image.to_string());
        }
        self.updated_at = Timestamp::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(name: Option<&str>) -> AuthenticatedUser {
        AuthenticatedUser::new(
            UserId::new("user_abc").unwrap(),
            "dana@example.com",
            name.map(String::from),
        )
    }

    #[test]
    fn name_defaults_to_email_local_part() {
        let user = User::from_identity(&identity(None));
        assert_eq!(user.name(), Some("dana"));
        assert_eq!(user.email(), "dana@example.com");
    }

    #[test]
    fn provider_name_is_kept() {
        let user = User::from_identity(&identity(Some("Dana Scully")));
        assert_eq!(user.name(), Some("Dana Scully"));
    }

    #[test]
    fn update_profile_changes_only_given_fields() {
        let mut user = User::from_identity(&identity(None));
        user.update_profile(None, Some("https://img.example.com/d.png")).unwrap();

        assert_eq!(user.name(), Some("dana"));
        assert_eq!(user.image(), Some("https://img.example.com/d.png"));
    }

    #[test]
    fn empty_image_clears_avatar() {
        let mut user = User::from_identity(&identity(None).with_image_url("x"));
        user.update_profile(None, Some("")).unwrap();
        assert_eq!(user.image(), None);
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut user = User::from_identity(&identity(None));
        assert!(user.update_profile(Some("  "), None).is_err());
        assert_eq!(user.name(), Some("dana"));
    }
}
