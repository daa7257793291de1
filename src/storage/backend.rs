//! Abstract storage backend trait.
//!
//! Every storage backend must implement [`StorageBackend`].  A backend is
//! bound to exactly one bucket at construction time, so callers only ever
//! deal in object keys and prefixes.

use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;
use std::time::SystemTime;
use thiserror::Error;

/// Content type reported when the backend has none on record.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A fetched object's data plus the metadata worth forwarding over HTTP.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Raw bytes of the object.
    pub data: Bytes,
    /// MIME type, defaulted to [`DEFAULT_CONTENT_TYPE`].
    pub content_type: String,
    /// Quoted ETag, if the backend reported one.
    pub etag: Option<String>,
    /// Last modification time, if the backend reported one.
    pub last_modified: Option<SystemTime>,
}

/// One page of a delimiter-bounded prefix enumeration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixListing {
    /// Immediate sub-prefixes, each ending in `/`.
    pub directories: Vec<String>,
    /// Full keys of objects directly under the prefix.
    pub files: Vec<String>,
    /// True when the backend had more entries than it returned.
    pub truncated: bool,
}

impl PrefixListing {
    /// Whether the enumeration matched nothing at all.
    pub fn is_empty(&self) -> bool {
        self.directories.is_empty() && self.files.is_empty()
    }
}

/// Failures reported by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The key does not exist in the bucket.
    #[error("no such key: {key}")]
    NoSuchKey { key: String },

    /// The backend answered with an error other than a missing key
    /// (access denied, throttling, missing bucket, ...).
    #[error("{0:#}")]
    Service(anyhow::Error),

    /// No answer from the backend: connection failure, timeout, or a body
    /// that could not be read.
    #[error("{0:#}")]
    Transport(anyhow::Error),
}

/// Boxed future returned by [`StorageBackend`] methods.
pub type StorageFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StorageError>> + Send + 'a>>;

/// Async read-only object storage contract.
pub trait StorageBackend: Send + Sync + 'static {
    /// Name of the bucket this backend serves.
    fn bucket(&self) -> &str;

    /// Read the full object at `key`.
    fn get_object(&self, key: &str) -> StorageFuture<'_, StoredObject>;

    /// List a single level under `prefix` using `/` as the delimiter.
    fn list_prefix(&self, prefix: &str) -> StorageFuture<'_, PrefixListing>;

    /// Check that the bucket exists and is reachable with the current
    /// credentials.
    fn head_bucket(&self) -> StorageFuture<'_, ()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_is_empty() {
        assert!(PrefixListing::default().is_empty());
        let listing = PrefixListing {
            directories: vec!["a/b/".to_string()],
            ..Default::default()
        };
        assert!(!listing.is_empty());
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::NoSuchKey {
            key: "docs/index.html".to_string(),
        };
        assert_eq!(err.to_string(), "no such key: docs/index.html");

        let err = StorageError::Service(anyhow::anyhow!("AccessDenied: Access Denied"));
        assert_eq!(err.to_string(), "AccessDenied: Access Denied");
    }
}
