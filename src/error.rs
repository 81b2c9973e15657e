//! Error types for the vodhub server.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use vodhub_search::SearchError;

/// Top-level error type for the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A required request parameter is missing or unusable.
    #[error("{0}")]
    BadRequest(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Failure reported by the search engine.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Search(SearchError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
            Self::Search(SearchError::NoSources(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Search(SearchError::NotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ServerError>;
