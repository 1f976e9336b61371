// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::store::StoreError;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., duplicate username)
    Conflict(String),

    /// The favourites set was updated but the playlist rating was not.
    /// Carries the playlist id so the caller can compensate.
    PartialSync { playlist_id: uuid::Uuid, reason: String },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON `{ "message": ... }` response with the matching status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::PartialSync {
                playlist_id,
                reason,
            } => {
                tracing::error!(%playlist_id, "Partial favourites sync: {}", reason);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!(
                        "Favourites were updated but the rating of playlist {} was not",
                        playlist_id
                    ),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };
        let body = Json(json!({
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Converts store failures so services can use `?` on store calls.
/// Unique violations become 409, backend failures an opaque 500.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(field) => {
                AppError::Conflict(format!("{} already exists", field.describe()))
            }
            StoreError::Backend(msg) => AppError::InternalServerError(msg),
            StoreError::PartialSync {
                playlist_id,
                reason,
            } => AppError::PartialSync {
                playlist_id,
                reason,
            },
        }
    }
}
