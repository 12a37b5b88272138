//! Error responses shared by all HTTP routes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::application::ChatError;

/// Standard error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "BAD_REQUEST".to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<&ChatError> for ErrorResponse {
    fn from(error: &ChatError) -> Self {
        let details = match error {
            ChatError::NotFound { resource, id } => Some(json!({ "resource": resource, "id": id })),
            ChatError::ProviderFailure { retryable, .. } => Some(json!({ "retryable": retryable })),
            _ => None,
        };
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
            details,
        }
    }
}

/// HTTP status for an application error.
pub fn status_for(error: &ChatError) -> StatusCode {
    match error {
        ChatError::Unauthorized => StatusCode::UNAUTHORIZED,
        ChatError::NotFound { .. } => StatusCode::NOT_FOUND,
        ChatError::InvalidRole | ChatError::Busy => StatusCode::CONFLICT,
        ChatError::Validation(_) => StatusCode::BAD_REQUEST,
        ChatError::ProviderFailure { .. } => StatusCode::BAD_GATEWAY,
        ChatError::PersistenceFailure(_) | ChatError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub fn handle_chat_error(error: ChatError) -> Response {
    let status = status_for(&error);
    if status.is_server_error() {
        tracing::error!(code = error.code(), error = %error, "request failed");
    } else {
        tracing::debug!(code = error.code(), error = %error, "request rejected");
    }
    (status, Json(ErrorResponse::from(&error))).into_response()
}

/// 400 response for a path segment that is not a valid identifier.
pub fn invalid_id(what: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::bad_request(format!("Invalid {} ID", what))),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(status_for(&ChatError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_for(&ChatError::not_found("Conversation", "c-1")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_for(&ChatError::InvalidRole), StatusCode::CONFLICT);
        assert_eq!(status_for(&ChatError::Busy), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&ChatError::Validation("content".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&ChatError::provider("503", true)),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&ChatError::PersistenceFailure("down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_body_names_the_resource() {
        let body = ErrorResponse::from(&ChatError::not_found("Message", "m-1"));
        assert_eq!(body.code, "NOT_FOUND");
        assert_eq!(body.details, Some(json!({ "resource": "Message", "id": "m-1" })));
    }

    #[test]
    fn provider_failure_body_reports_retryability() {
        let body = ErrorResponse::from(&ChatError::provider("rate limited", true));
        assert_eq!(body.code, "PROVIDER_FAILURE");
        assert_eq!(body.details, Some(json!({ "retryable": true })));
    }

    #[test]
    fn details_are_omitted_when_absent() {
        let json = serde_json::to_value(ErrorResponse::from(&ChatError::Busy)).unwrap();
        assert!(json.get("details").is_none());
        assert_eq!(json["code"], "BUSY");
    }

    #[test]
    fn handle_chat_error_sets_status() {
        let response = handle_chat_error(ChatError::InvalidRole);
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
