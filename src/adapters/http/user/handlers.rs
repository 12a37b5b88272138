//! HTTP handlers for user endpoints.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::adapters::http::error::handle_chat_error;
use crate::adapters::http::middleware::RequireAuth;
use crate::application::handlers::{
    GetCurrentUserHandler, GetCurrentUserQuery, SyncUserCommand, SyncUserHandler,
    UpdateProfileCommand, UpdateProfileHandler,
};

use super::dto::{CurrentUserResponse, UpdateProfileRequest, UserResponse};

#[derive(Clone)]
pub struct UserHandlers {
    sync_handler: Arc<SyncUserHandler>,
    current_handler: Arc<GetCurrentUserHandler>,
    update_handler: Arc<UpdateProfileHandler>,
}

impl UserHandlers {
    pub fn new(
        sync_handler: Arc<SyncUserHandler>,
        current_handler: Arc<GetCurrentUserHandler>,
        update_handler: Arc<UpdateProfileHandler>,
    ) -> Self {
        Self {
            sync_handler,
            current_handler,
            update_handler,
        }
    }
}

/// POST /api/users - Get or create the account of the authenticated user
pub async fn sync_user(
    State(handlers): State<UserHandlers>,
    RequireAuth(user): RequireAuth,
) -> Response {
    match handlers.sync_handler.handle(SyncUserCommand { identity: user }).await {
        Ok(result) => {
            let status = if result.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, Json(UserResponse::from(&result.user))).into_response()
        }
        Err(e) => handle_chat_error(e),
    }
}

/// GET /api/users/me - Current user with recent chats
pub async fn get_current_user(
    State(handlers): State<UserHandlers>,
    RequireAuth(user): RequireAuth,
) -> Response {
    let query = GetCurrentUserQuery { user_id: user.id };

    match handlers.current_handler.handle(query).await {
        Ok(view) => (StatusCode::OK, Json(CurrentUserResponse::from(&view))).into_response(),
        Err(e) => handle_chat_error(e),
    }
}

/// PUT /api/users/me - Update name and avatar
pub async fn update_profile(
    State(handlers): State<UserHandlers>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<UpdateProfileRequest>,
) -> Response {
    let cmd = UpdateProfileCommand {
        user_id: user.id,
        name: req.name,
        image: req.image,
    };

    match handlers.update_handler.handle(cmd).await {
        Ok(user) => (StatusCode::OK, Json(UserResponse::from(&user))).into_response(),
        Err(e) => handle_chat_error(e),
    }
}
