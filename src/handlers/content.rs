//! Content handlers: objects and synthesized directory listings.
//!
//! A request path maps to an object key; directory-style paths get
//! `index.html` appended.  When the key does not exist, the path is
//! treated as a directory and listed one level deep instead.

use std::sync::Arc;
use std::time::SystemTime;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::ProxyError;
use crate::metrics::{record_bytes_sent, record_listing_fallback};
use crate::storage::backend::{StorageError, StoredObject, DEFAULT_CONTENT_TYPE};
use crate::AppState;

/// Default document served for directory-style paths.
pub const INDEX_DOCUMENT: &str = "index.html";

/// JSON body returned for a synthesized directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryListing {
    /// The request path as received, without its leading `/`.
    pub path: String,
    /// Immediate sub-prefixes.
    pub directories: Vec<String>,
    /// Full keys of objects directly under the prefix.
    pub files: Vec<String>,
}

// -- Path resolution ----------------------------------------------------------

/// Map a request path (without its leading `/`) to an object key.
///
/// Empty and `/`-terminated paths get [`INDEX_DOCUMENT`] appended, so the
/// result is never empty.
pub fn resolve_key(raw_path: &str) -> String {
    if raw_path.is_empty() || raw_path.ends_with('/') {
        format!("{raw_path}{INDEX_DOCUMENT}")
    } else {
        raw_path.to_string()
    }
}

/// Prefix to list when the resolved key is missing.
///
/// Derived from the request path rather than the resolved key, so that
/// `images/` lists `images/` and not `images/index.html/`.  The empty path
/// lists the bucket root.
pub fn listing_prefix(raw_path: &str) -> String {
    if raw_path.is_empty() || raw_path.ends_with('/') {
        raw_path.to_string()
    } else {
        format!("{raw_path}/")
    }
}

// -- Handlers -----------------------------------------------------------------

/// `GET /{path}` -- Serve the object at the resolved key, or a directory
/// listing when no such object exists.
pub async fn serve_content(state: Arc<AppState>, raw_path: &str) -> Result<Response, ProxyError> {
    let key = resolve_key(raw_path);

    match state.storage.get_object(&key).await {
        Ok(object) => Ok(object_response(object)),
        Err(StorageError::NoSuchKey { .. }) => {
            debug!("Key {} not found, trying directory listing", key);
            match list_directory(&state, raw_path).await {
                Some(listing) => Ok((StatusCode::OK, Json(listing)).into_response()),
                None => Err(ProxyError::NotFound { key }),
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// List `raw_path` as a directory.
///
/// Returns `None` when nothing lives under the prefix or the listing call
/// fails; a failure is logged but still surfaces to the caller as a 404.
async fn list_directory(state: &AppState, raw_path: &str) -> Option<DirectoryListing> {
    let prefix = listing_prefix(raw_path);

    let listing = match state.storage.list_prefix(&prefix).await {
        Ok(listing) => listing,
        Err(e) => {
            warn!(
                "Directory listing failed for bucket={} prefix={}: {}",
                state.storage.bucket(),
                prefix,
                e
            );
            record_listing_fallback("error");
            return None;
        }
    };

    if listing.is_empty() {
        record_listing_fallback("miss");
        return None;
    }

    if listing.truncated {
        warn!(
            event = "listing_truncated",
            "Directory listing for prefix={} truncated at {} entries",
            prefix,
            state.config.storage.list_max_keys
        );
    }

    record_listing_fallback("hit");
    Some(DirectoryListing {
        path: raw_path.to_string(),
        directories: listing.directories,
        files: listing.files,
    })
}

/// Build the 200 response for a fetched object.
fn object_response(object: StoredObject) -> Response {
    record_bytes_sent(object.data.len());

    let content_type = HeaderValue::from_str(&object.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

    let mut response = (StatusCode::OK, object.data).into_response();
    let hdrs = response.headers_mut();
    hdrs.insert(header::CONTENT_TYPE, content_type);

    if let Some(ref etag) = object.etag {
        if let Ok(val) = HeaderValue::from_str(etag) {
            hdrs.insert(header::ETAG, val);
        }
    }
    if let Some(modified) = object.last_modified {
        if let Ok(val) = HeaderValue::from_str(&http_date(modified)) {
            hdrs.insert(header::LAST_MODIFIED, val);
        }
    }

    response
}

fn http_date(time: SystemTime) -> String {
    httpdate::fmt_http_date(time)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_key_empty() {
        assert_eq!(resolve_key(""), "index.html");
    }

    #[test]
    fn test_resolve_key_trailing_slash() {
        assert_eq!(resolve_key("images/"), "images/index.html");
        assert_eq!(resolve_key("a/b/c/"), "a/b/c/index.html");
    }

    #[test]
    fn test_resolve_key_plain() {
        assert_eq!(resolve_key("css/site.css"), "css/site.css");
        assert_eq!(resolve_key("images"), "images");
    }

    #[test]
    fn test_resolve_key_passes_through_odd_segments() {
        assert_eq!(resolve_key("a/../b"), "a/../b");
        assert_eq!(resolve_key("a//b"), "a//b");
    }

    #[test]
    fn test_resolve_key_never_empty() {
        for raw in ["", "/", "x", "x/", "x/y/"] {
            let key = resolve_key(raw);
            assert!(!key.is_empty());
            if raw.is_empty() || raw.ends_with('/') {
                assert_eq!(key, format!("{raw}index.html"));
            }
        }
    }

    #[test]
    fn test_listing_prefix() {
        assert_eq!(listing_prefix(""), "");
        assert_eq!(listing_prefix("images/"), "images/");
        assert_eq!(listing_prefix("images"), "images/");
        assert_eq!(listing_prefix("a/b"), "a/b/");
    }

    #[test]
    fn test_http_date_format() {
        assert_eq!(
            http_date(SystemTime::UNIX_EPOCH),
            "Thu, 01 Jan 1970 00:00:00 GMT"
        );
    }

    #[test]
    fn test_directory_listing_json_shape() {
        let listing = DirectoryListing {
            path: "images/".to_string(),
            directories: vec![],
            files: vec!["images/icon.png".to_string()],
        };
        assert_eq!(
            serde_json::to_value(&listing).unwrap(),
            serde_json::json!({
                "path": "images/",
                "directories": [],
                "files": ["images/icon.png"]
            })
        );
    }

    #[tokio::test]
    async fn test_object_response_headers() {
        let response = object_response(StoredObject {
            data: bytes::Bytes::from_static(b"body{}"),
            content_type: "text/css".to_string(),
            etag: Some("\"abc123\"".to_string()),
            last_modified: Some(SystemTime::UNIX_EPOCH),
        });
        assert_eq!(response.status(), StatusCode::OK);
        let hdrs = response.headers();
        assert_eq!(hdrs[header::CONTENT_TYPE], "text/css");
        assert_eq!(hdrs[header::ETAG], "\"abc123\"");
        assert_eq!(hdrs[header::LAST_MODIFIED], "Thu, 01 Jan 1970 00:00:00 GMT");
    }
}
