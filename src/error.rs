use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// ApiError
///
/// The single error taxonomy for the application core. Every fallible operation
/// in the token, storage, repository, and image service layers returns one of
/// these variants; the `IntoResponse` implementation below is the only place
/// where taxonomy entries are translated into transport-level status codes.
///
/// Handlers never build raw `StatusCode` rejections for business failures —
/// they propagate `ApiError` with `?` and let the boundary mapping decide.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request payload failed validation (empty file, disallowed content type,
    /// missing required field). Maps to 400.
    #[error("{0}")]
    InvalidInput(String),

    /// The requested record does not exist. Maps to 404.
    #[error("{0}")]
    NotFound(String),

    /// The acting principal is authenticated but does not own the resource.
    /// Maps to 403.
    #[error("{0}")]
    Forbidden(String),

    /// A unique field (username, email) is already taken. Maps to 409.
    #[error("{0}")]
    Conflict(String),

    /// The presented bearer token is syntactically or cryptographically
    /// invalid. Maps to 401.
    #[error("invalid token")]
    InvalidToken,

    /// The presented bearer token is past its expiry. Maps to 401.
    #[error("token expired")]
    Expired,

    /// Username/password authentication failed. Maps to 401.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// An I/O fault in the file storage engine during `store`. Maps to 500.
    /// (`delete` and `list` convert their faults per the storage contract
    /// and never produce this variant.)
    #[error("storage failure: {0}")]
    Storage(String),

    /// An unexpected fault in the persistent store. Maps to 500.
    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InvalidToken | ApiError::Expired | ApiError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Storage(_) | ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal faults are logged with full detail but reported to the
        // client with a generic message to avoid leaking paths or SQL.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error: {self}");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
