//! Axum router construction.
//!
//! The [`app`] function wires the health probe, the optional metrics
//! endpoint, and the catch-all content route, and returns a ready-to-serve
//! [`axum::Router`].  Every response passes through the access log.

use axum::{
    extract::{Path, State},
    middleware,
    response::Response,
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::access_log::access_log_middleware;
use crate::errors::ProxyError;
use crate::metrics::{metrics_handler, metrics_middleware};
use crate::AppState;

/// Build the axum [`Router`] serving the configured bucket.
///
/// `/health` and `/metrics` take precedence over objects of the same name.
pub fn app(state: Arc<AppState>) -> Router {
    let metrics_enabled = state.config.observability.metrics;

    let mut router = Router::new()
        // Liveness probe (checks the bucket, not an object).
        .route("/health", get(handle_health));

    if metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    let router = router
        // GET / -> index.html or a root listing
        .route("/", get(handle_get_root))
        // Wildcard captures slashes in object keys.
        .route("/*path", get(handle_get_path))
        .with_state(state)
        // access_log_middleware is inner so it sees the final status of
        // every response, including 405s.
        .layer(middleware::from_fn(access_log_middleware));

    if metrics_enabled {
        // metrics_middleware is outer (captures full request lifecycle).
        router.layer(middleware::from_fn(metrics_middleware))
    } else {
        router
    }
}

// -- Dispatch -----------------------------------------------------------------

/// `GET /health`
async fn handle_health(State(state): State<Arc<AppState>>) -> Response {
    crate::handlers::health::health_check(state).await
}

/// `GET /`
async fn handle_get_root(State(state): State<Arc<AppState>>) -> Result<Response, ProxyError> {
    crate::handlers::content::serve_content(state, "").await
}

/// `GET /*path`
async fn handle_get_path(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Response, ProxyError> {
    crate::handlers::content::serve_content(state, &path).await
}

// -- Tests --------------------------------------------------------------------
