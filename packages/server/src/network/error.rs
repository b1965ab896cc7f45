//! Transport-level errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use memkv_core::StoreError;
use tracing::{debug, error};

/// Failure of a single HTTP request.
///
/// `MalformedInput` never reaches the store. Store failures keep their
/// typed cause; `NotFound` maps to 404 and everything else to 500, matching
/// how the routes report backend errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("malformed request: {0}")]
    MalformedInput(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Status code this error is reported with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MalformedInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::MalformedInput(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(%status, "request failed: {}", self);
        } else {
            debug!(%status, "request rejected: {}", self);
        }
        // Plain-text, single-line bodies.
        let body = match &self {
            ApiError::MalformedInput(_) => "Bad request".to_string(),
            ApiError::Store(err @ StoreError::NotFound { .. }) => err.to_string(),
            ApiError::Store(_) | ApiError::Internal(_) => "Internal server error".to_string(),
        };
        (status, body).into_response()
    }
}
