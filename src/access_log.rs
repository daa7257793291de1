//! Per-request access logging.
//!
//! [`access_log_middleware`] wraps the whole router, so every response,
//! including axum's own 405s, produces exactly one `http_request` event.
//! With the JSON formatter the event renders as a single line:
//!
//! ```text
//! {"timestamp":"...","level":"INFO","event":"http_request","method":"GET",
//!  "path":"/images/","status_code":200,"client_ip":"10.0.0.7",
//!  "user_agent":"curl/8.5.0","target":"s3front::access"}
//! ```

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;

use crate::errors::RequestError;

/// Value used when the client sends no `User-Agent`.
const UNKNOWN_USER_AGENT: &str = "Unknown";

/// One access-log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRecord {
    pub method: String,
    pub path: String,
    pub status_code: u16,
    pub client_ip: String,
    pub user_agent: String,
    pub error: Option<String>,
}

impl AccessRecord {
    /// Emit the record as an `http_request` event.
    pub fn emit(&self) {
        tracing::info!(
            target: "s3front::access",
            event = "http_request",
            method = %self.method,
            path = %self.path,
            status_code = self.status_code,
            client_ip = %self.client_ip,
            user_agent = %self.user_agent,
            error = self.error.as_deref(),
        );
    }
}

/// Client address: the `X-Forwarded-For` header as sent, else the peer IP.
pub fn client_ip(headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|ConnectInfo(addr)| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// `User-Agent` header, defaulting to `"Unknown"`.
pub fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or(UNKNOWN_USER_AGENT)
        .to_string()
}

/// Axum middleware that logs one [`AccessRecord`] per response.
///
/// Handlers report failure detail through a [`RequestError`] response
/// extension, which is consumed here.
pub async fn access_log_middleware(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let client_ip = client_ip(
        req.headers(),
        req.extensions().get::<ConnectInfo<SocketAddr>>(),
    );
    let user_agent = user_agent(req.headers());

    let mut response = next.run(req).await;
    let error = response
        .extensions_mut()
        .remove::<RequestError>()
        .map(|RequestError(msg)| msg);

    AccessRecord {
        method,
        path,
        status_code: response.status().as_u16(),
        client_ip,
        user_agent,
        error,
    }
    .emit();

    response
}
