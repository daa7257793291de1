//! Liveness probe.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::warn;

use crate::errors::RequestError;
use crate::AppState;

/// Body of a `GET /health` response.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy { bucket: String },
    Unhealthy { error: String },
}

/// `GET /health` -- Check that the bucket is reachable.
///
/// Returns 200 `{"status":"healthy","bucket":..}` when `HeadBucket`
/// succeeds and 503 `{"status":"unhealthy","error":..}` otherwise.  No
/// object is read.
pub async fn health_check(state: Arc<AppState>) -> Response {
    match state.storage.head_bucket().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthStatus::Healthy {
                bucket: state.storage.bucket().to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            let error = e.to_string();
            warn!("Health check failed for bucket {}: {}", state.storage.bucket(), error);
            let mut response = (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthStatus::Unhealthy {
                    error: error.clone(),
                }),
            )
                .into_response();
            response.extensions_mut().insert(RequestError(error));
            response
        }
    }
}
