//! Error types for OAuthDash
//!
//! Every failure while talking to the backend is expressed as an `AppError`.
//! Page handlers usually recover from these themselves; anything left over
//! is turned into an HTTP response through `IntoResponse`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Unauthorized and unrecoverable: the session refresh failed,
    /// or the request was already replayed once after a refresh.
    #[error("Authentication required")]
    Authentication,

    /// Backend answered with an error status other than 401
    #[error("Backend returned HTTP {status} for {path}")]
    Backend {
        status: StatusCode,
        path: String,
        body: String,
    },

    /// Network failure talking to the backend
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Backend body could not be decoded
    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether this error belongs to the transport class
    /// (network failure, malformed response or non-401 error status).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AppError::Backend { .. } | AppError::HttpClient(_) | AppError::InvalidResponse(_)
        )
    }

    /// Short label used for metrics and the JSON error body
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Authentication => "authentication",
            AppError::Backend { .. } => "backend",
            AppError::HttpClient(_) => "http_client",
            AppError::InvalidResponse(_) => "invalid_response",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidResponse(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Backend failures surface as 502 so they are distinguishable from
    /// failures of this server itself.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message) = match &self {
            AppError::Authentication => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Backend { .. } | AppError::HttpClient(_) | AppError::InvalidResponse(_) => {
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[self.kind()]).inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
