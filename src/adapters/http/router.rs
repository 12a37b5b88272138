//! Top-level router: health, the `/api` surface, and shared layers.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{HeaderValue, StatusCode},
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::application::handlers::{
    CreateConversationHandler, DeleteConversationHandler, EditMessageHandler,
    GetConversationHandler, GetCurrentUserHandler, ListConversationsHandler,
    RenameConversationHandler, SubmitMessageHandler, SyncUserHandler, UpdateProfileHandler,
};
use crate::application::{SessionRegistry, StreamReconciler};
use crate::ports::{ConversationStore, UserRepository};

use super::chat::{chat_routes, ChatHandlers};
use super::middleware::{auth_middleware, AuthState};
use super::user::{user_routes, UserHandlers};

/// Everything the HTTP surface needs, wired once at startup.
pub struct Services {
    pub store: Arc<dyn ConversationStore>,
    pub users: Arc<dyn UserRepository>,
    pub registry: Arc<SessionRegistry>,
    pub reconciler: Arc<StreamReconciler>,
    pub validator: AuthState,
}

impl Services {
    /// Builds every handler and mounts them with `api_router`.
    pub fn into_router(self) -> Router {
        let Services {
            store,
            users,
            registry,
            reconciler,
            validator,
        } = self;

        let chat = ChatHandlers::new(
            Arc::new(SubmitMessageHandler::new(
                store.clone(),
                registry.clone(),
                reconciler.clone(),
            )),
            Arc::new(EditMessageHandler::new(
                store.clone(),
                registry.clone(),
                reconciler,
            )),
            Arc::new(CreateConversationHandler::new(store.clone())),
            Arc::new(GetConversationHandler::new(store.clone(), registry.clone())),
            Arc::new(ListConversationsHandler::new(store.clone())),
            Arc::new(RenameConversationHandler::new(store.clone(), registry.clone())),
            Arc::new(DeleteConversationHandler::new(store.clone(), registry)),
        );
        let user_handlers = UserHandlers::new(
            Arc::new(SyncUserHandler::new(users.clone())),
            Arc::new(GetCurrentUserHandler::new(users.clone(), store)),
            Arc::new(UpdateProfileHandler::new(users)),
        );

        api_router(chat, user_handlers, validator)
    }
}

/// GET /health - Liveness probe (unauthenticated)
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// Routes with authentication applied. Handlers enforce it per route.
pub fn api_router(chat: ChatHandlers, users: UserHandlers, validator: AuthState) -> Router {
    let api = Router::new()
        .merge(chat_routes(chat))
        .merge(user_routes(users));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(validator, auth_middleware))
}

/// Adds tracing, CORS and the response timeout.
///
/// The timeout bounds the time to response headers. Streamed bodies are not
/// cut off.
pub fn with_http_layers(router: Router, cors_origins: &[String], request_timeout: Duration) -> Router {
    router
        .layer(cors_layer(cors_origins))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}

/// Any origin when none are configured.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(allowed)
    }
}
