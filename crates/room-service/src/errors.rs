//! Room service error types.
//!
//! `RoomError` is what the hub and the HTTP boundary return. Every variant
//! maps to an HTTP status and a client-safe message; internal details
//! (store backend errors, hashing failures) are logged server-side but never
//! sent to clients.
//!
//! Rate-limit evictions and full-room rejections are not errors: they are
//! deterministic outcomes delivered to the peer as close frames.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Room service error type.
///
/// Maps to HTTP status codes:
/// - `InvalidRequest`: 400
/// - `Unauthorized`: 403
/// - `RoomNotFound`: 404
/// - `RoomLimitReached`: 503
/// - `IdGenerationFailed`, `StoreWriteFailed`, `StoreReadFailed`, `Internal`: 500
#[derive(Debug, Error)]
pub enum RoomError {
    /// The store has no record for the requested room.
    #[error("Room not found")]
    RoomNotFound,

    /// No unused room ID could be generated within the retry bound.
    #[error("Unable to generate a unique room ID")]
    IdGenerationFailed,

    /// A write to the store failed.
    #[error("Store write failed: {0}")]
    StoreWriteFailed(String),

    /// A read from the store failed.
    #[error("Store read failed: {0}")]
    StoreReadFailed(String),

    /// The hub already runs the configured maximum number of rooms.
    #[error("Room limit reached")]
    RoomLimitReached,

    /// Malformed or out-of-bounds client input.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Wrong password or missing/expired session.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RoomError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RoomError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RoomError::Unauthorized(_) => StatusCode::FORBIDDEN,
            RoomError::RoomNotFound => StatusCode::NOT_FOUND,
            RoomError::RoomLimitReached => StatusCode::SERVICE_UNAVAILABLE,
            RoomError::IdGenerationFailed
            | RoomError::StoreWriteFailed(_)
            | RoomError::StoreReadFailed(_)
            | RoomError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a stable machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            RoomError::RoomNotFound => "ROOM_NOT_FOUND",
            RoomError::IdGenerationFailed => "ID_GENERATION_FAILED",
            RoomError::StoreWriteFailed(_) | RoomError::StoreReadFailed(_) => "STORE_ERROR",
            RoomError::RoomLimitReached => "ROOM_LIMIT_REACHED",
            RoomError::InvalidRequest(_) => "BAD_REQUEST",
            RoomError::Unauthorized(_) => "UNAUTHORIZED",
            RoomError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns a client-safe error message (no internal details).
    pub fn client_message(&self) -> String {
        match self {
            RoomError::RoomNotFound => "Room is invalid or has expired".to_string(),
            RoomError::IdGenerationFailed => "Error creating room".to_string(),
            RoomError::StoreWriteFailed(_)
            | RoomError::StoreReadFailed(_)
            | RoomError::Internal(_) => "An internal error occurred".to_string(),
            RoomError::RoomLimitReached => {
                "Too many active rooms, please try again later".to_string()
            }
            RoomError::InvalidRequest(msg) | RoomError::Unauthorized(msg) => msg.clone(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for RoomError {
    fn into_response(self) -> Response {
        match &self {
            RoomError::StoreWriteFailed(err) | RoomError::StoreReadFailed(err) => {
                tracing::error!(target: "room.http", error = %err, "Store operation failed");
            }
            RoomError::Internal(err) => {
                tracing::error!(target: "room.http", error = %err, "Internal error");
            }
            _ => {}
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code(),
                message: self.client_message(),
            },
        };

        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(
            RoomError::InvalidRequest("x".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RoomError::Unauthorized("x".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(RoomError::RoomNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            RoomError::RoomLimitReached.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            RoomError::IdGenerationFailed.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            RoomError::StoreWriteFailed("down".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_client_messages_hide_internal_details() {
        let err = RoomError::StoreReadFailed("connection refused at 10.0.0.7:6379".to_string());
        assert!(!err.client_message().contains("10.0.0.7"));
        assert_eq!(err.client_message(), "An internal error occurred");

        let err = RoomError::Internal("bcrypt cost out of range".to_string());
        assert!(!err.client_message().contains("bcrypt"));
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            format!("{}", RoomError::StoreWriteFailed("timeout".to_string())),
            "Store write failed: timeout"
        );
        assert_eq!(format!("{}", RoomError::RoomNotFound), "Room not found");
    }

    #[tokio::test]
    async fn test_into_response_body_shape() {
        let response = RoomError::Unauthorized("incorrect password".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
        assert_eq!(body["error"]["message"], "incorrect password");
    }
}
