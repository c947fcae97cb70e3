//! HTTP error mapping for API handlers.

use crate::blob::BlobError;
use crate::AppError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Errors surfaced by handlers, rendered as `{success: false, error}`.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error(transparent)]
    App(#[from] AppError),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
}

impl HttpError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Replace a core `NotFound` with a resource-specific message.
    pub fn not_found_as(err: AppError, message: &str) -> Self {
        match err {
            AppError::NotFound => Self::not_found(message),
            other => Self::App(other),
        }
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            Self::App(AppError::NotFound) => (StatusCode::NOT_FOUND, "Not found".to_string()),
            Self::App(AppError::Validation(message)) => {
                (StatusCode::BAD_REQUEST, message.clone())
            }
            Self::App(err) => {
                tracing::error!("Request failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        }
    }
}

impl From<BlobError> for HttpError {
    fn from(err: BlobError) -> Self {
        Self::App(err.into())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::HttpError;
    use crate::blob::BlobError;
    use crate::AppError;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn app_errors_map_to_status_codes() {
        let cases = [
            (HttpError::from(AppError::NotFound), StatusCode::NOT_FOUND),
            (
                HttpError::from(AppError::Validation("bad".to_string())),
                StatusCode::BAD_REQUEST,
            ),
            (
                HttpError::from(AppError::Storage("disk".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (HttpError::from(AppError::Timeout), StatusCode::INTERNAL_SERVER_ERROR),
            (HttpError::Unauthorized, StatusCode::UNAUTHORIZED),
            (HttpError::bad_request("x"), StatusCode::BAD_REQUEST),
            (HttpError::not_found("x"), StatusCode::NOT_FOUND),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn not_found_as_keeps_other_errors() {
        assert!(matches!(
            HttpError::not_found_as(AppError::NotFound, "Image not found"),
            HttpError::NotFound(message) if message == "Image not found"
        ));
        assert!(matches!(
            HttpError::not_found_as(AppError::Timeout, "Image not found"),
            HttpError::App(AppError::Timeout)
        ));
    }
}
