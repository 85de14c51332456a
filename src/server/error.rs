//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, AppError>`; any [`lazyhls_common::Error`]
//! converts into it with `?`. Segment failures arrive already shared behind an
//! `Arc` so every waiter reports the same error.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lazyhls_common::Error;
use serde_json::json;
use std::sync::Arc;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError(Arc<Error>);

impl AppError {
    pub fn inner(&self) -> &Error {
        &self.0
    }
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        Self(Arc::new(e))
    }
}

impl From<Arc<Error>> for AppError {
    fn from(e: Arc<Error>) -> Self {
        Self(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.0,
                "Server error in API handler"
            );
        }

        let body = json!({
            "success": false,
            "error": self.0.to_string(),
            "code": self.0.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}
