//! HTTP-facing error types.
//!
//! Handlers return `Err(ProxyError::..)` and the [`IntoResponse`] impl
//! renders the JSON error body.  Every error response also carries a
//! [`RequestError`] extension so the access log can record what went wrong
//! without the message leaking into the body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::storage::backend::StorageError;

/// Error detail attached to a response for the access log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestError(pub String);

/// Request failures expressed as a Rust enum.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Neither an object nor a directory exists at the requested path.
    #[error("File not found")]
    NotFound { key: String },

    /// The backend answered with an error; the detail stays in the log.
    #[error("Internal server error")]
    Backend(anyhow::Error),

    /// Unexpected failure; the detail is returned to the caller as well.
    #[error("Internal server error")]
    Internal(anyhow::Error),
}

impl ProxyError {
    /// Return the appropriate HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::NotFound { .. } => StatusCode::NOT_FOUND,
            ProxyError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message recorded in the access log for this error.
    pub fn log_message(&self) -> String {
        match self {
            ProxyError::NotFound { .. } => "Not Found".to_string(),
            ProxyError::Backend(e) | ProxyError::Internal(e) => format!("{e:#}"),
        }
    }
}

impl From<StorageError> for ProxyError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NoSuchKey { key } => ProxyError::NotFound { key },
            StorageError::Service(e) => ProxyError::Backend(e),
            StorageError::Transport(e) => ProxyError::Internal(e),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let ProxyError::NotFound { key } = &self {
            debug!("No object or directory at key {}", key);
        }
        let body = match &self {
            ProxyError::Internal(e) => json!({
                "error": self.to_string(),
                "details": format!("{e:#}"),
            }),
            _ => json!({ "error": self.to_string() }),
        };

        let mut response = (status, Json(body)).into_response();
        response
            .extensions_mut()
            .insert(RequestError(self.log_message()));
        response
    }
}
