//! HTTP DTOs for user endpoints.

use serde::{Deserialize, Serialize};

use crate::adapters::http::chat::ChatSummaryResponse;
use crate::application::handlers::CurrentUserView;
use crate::domain::user::User;

/// Body of `PUT /api/users/me`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id().to_string(),
            email: user.email().to_string(),
            name: user.name().map(String::from),
            image: user.image().map(String::from),
            created_at: user.created_at().to_rfc3339(),
            updated_at: user.updated_at().to_rfc3339(),
        }
    }
}

/// The signed-in user with their most recent chats.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub chats: Vec<ChatSummaryResponse>,
}

impl From<&CurrentUserView> for CurrentUserResponse {
    fn from(view: &CurrentUserView) -> Self {
        Self {
            user: UserResponse::from(&view.user),
            chats: view
                .recent_conversations
                .iter()
                .map(ChatSummaryResponse::from)
                .collect(),
        }
    }
}
