//! HTTP routes for user endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{get_current_user, sync_user, update_profile, UserHandlers};

/// Creates the user router. Paths are relative to `/api`.
pub fn user_routes(handlers: UserHandlers) -> Router {
    Router::new()
        .route("/users", post(sync_user))
        .route("/users/me", get(get_current_user).put(update_profile))
        .with_state(handlers)
}
