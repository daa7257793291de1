//! s3front library -- serve a private S3 bucket over plain HTTP.
//!
//! Requests map to object keys; directory-style paths fall back to
//! `index.html` and then to a synthesized JSON listing.  Every response is
//! recorded as one structured access-log event.

use std::sync::Arc;

pub mod access_log;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod server;
pub mod storage;

use crate::config::Config;
use crate::storage::backend::StorageBackend;

/// Shared application state passed to all handlers via `axum::extract::State`.
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// Object storage backend bound to the served bucket.
    pub storage: Arc<dyn StorageBackend>,
}
