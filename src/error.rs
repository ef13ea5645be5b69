//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{ChatId, UserId};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "user not found: 42"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see [`GatewayError`] code ranges).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// Relationship and chat visibility failures deliberately surface as
/// "not found" rather than "forbidden", so a caller cannot probe for the
/// existence of chats or requests it is not part of.
///
/// # Error Code Ranges
///
/// | Range     | Category             | HTTP Status               |
/// |-----------|----------------------|---------------------------|
/// | 1000–1999 | Validation           | 400 Bad Request           |
/// | 2000–2999 | Not Found            | 404 Not Found             |
/// | 3000–3999 | Server / Transient   | 500 Internal Server Error |
/// | 4000–4999 | Authentication       | 401 Unauthorized          |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A user tried to act on themselves.
    #[error("cannot target yourself")]
    SelfAction,

    /// The bearer credential is missing, malformed or expired.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Target user does not exist.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// Chat does not exist or the caller is not a participant.
    #[error("chat not found: {0}")]
    ChatNotFound(ChatId),

    /// No connection exists between the caller and this user.
    #[error("connection not found with user {0}")]
    ConnectionNotFound(UserId),

    /// No open like/superlike request from this user.
    #[error("no pending request from user {0}")]
    NoPendingRequest(UserId),

    /// A durable-store call exceeded its time budget. Safe to retry.
    #[error("store timed out; retry the request")]
    StoreTimeout,

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::SelfAction => 1002,
            Self::UserNotFound(_) => 2001,
            Self::ChatNotFound(_) => 2002,
            Self::ConnectionNotFound(_) => 2003,
            Self::NoPendingRequest(_) => 2004,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::StoreTimeout => 3002,
            Self::Unauthorized(_) => 4001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::SelfAction => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::UserNotFound(_)
            | Self::ChatNotFound(_)
            | Self::ConnectionNotFound(_)
            | Self::NoPendingRequest(_) => StatusCode::NOT_FOUND,
            Self::StoreTimeout | Self::PersistenceError(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// `true` when the client may retry the same request unchanged.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::StoreTimeout | Self::PersistenceError(_))
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        Self::PersistenceError(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: self
                    .is_transient()
                    .then(|| "transient failure, safe to retry".to_string()),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_400() {
        assert_eq!(GatewayError::SelfAction.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            GatewayError::InvalidRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn masked_visibility_maps_to_404() {
        assert_eq!(
            GatewayError::ChatNotFound(ChatId::new(1)).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::NoPendingRequest(UserId::new(1)).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn auth_and_transient_codes() {
        let unauthorized = GatewayError::Unauthorized("missing token".into());
        assert_eq!(unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(unauthorized.error_code(), 4001);

        assert!(GatewayError::StoreTimeout.is_transient());
        assert_eq!(
            GatewayError::StoreTimeout.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert!(!GatewayError::SelfAction.is_transient());
    }

    #[test]
    fn response_carries_status() {
        let response = GatewayError::UserNotFound(UserId::new(9)).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
