//! In-memory storage backend.
//!
//! Objects live in a `tokio::sync::RwLock<BTreeMap<...>>` keyed by object
//! key, so listings come out in the same lexicographic order S3 uses.
//! Faults can be injected per operation to exercise error paths without a
//! real bucket.

use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use std::time::SystemTime;

use super::backend::{
    PrefixListing, StorageBackend, StorageError, StorageFuture, StoredObject,
    DEFAULT_CONTENT_TYPE,
};

/// Backend operation a fault can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetObject,
    ListPrefix,
    HeadBucket,
}

/// A failure to return from an operation instead of touching the map.
#[derive(Debug, Clone)]
pub enum Fault {
    /// Behave like a service error response carrying this message.
    Service(String),
    /// Behave like a connection failure carrying this message.
    Transport(String),
}

impl Fault {
    fn to_error(&self) -> StorageError {
        match self {
            Fault::Service(msg) => StorageError::Service(anyhow::anyhow!("{msg}")),
            Fault::Transport(msg) => StorageError::Transport(anyhow::anyhow!("{msg}")),
        }
    }
}

/// Stored object: data plus optional explicit content type.
#[derive(Debug, Clone)]
struct Entry {
    data: Bytes,
    content_type: Option<String>,
    last_modified: SystemTime,
}

/// In-memory storage backend.
pub struct MemoryBackend {
    /// Bucket name reported by [`StorageBackend::bucket`].
    bucket: String,
    /// Object store: key -> entry.
    objects: tokio::sync::RwLock<BTreeMap<String, Entry>>,
    /// Injected failures per operation.
    faults: tokio::sync::RwLock<HashMap<Operation, Fault>>,
    /// Listing page size.
    list_max_keys: usize,
}

impl MemoryBackend {
    /// Create an empty backend for `bucket` with a 1000-entry listing page.
    pub fn new(bucket: &str) -> Self {
        Self::with_list_max_keys(bucket, 1000)
    }

    /// Create an empty backend with an explicit listing page size.
    pub fn with_list_max_keys(bucket: &str, list_max_keys: usize) -> Self {
        Self {
            bucket: bucket.to_string(),
            objects: tokio::sync::RwLock::new(BTreeMap::new()),
            faults: tokio::sync::RwLock::new(HashMap::new()),
            list_max_keys,
        }
    }

    /// Store `data` at `key`, replacing any existing object.
    pub async fn put(&self, key: &str, data: impl Into<Bytes>, content_type: Option<&str>) {
        let entry = Entry {
            data: data.into(),
            content_type: content_type.map(|ct| ct.to_string()),
            last_modified: SystemTime::now(),
        };
        self.objects.write().await.insert(key.to_string(), entry);
    }

    /// Make every subsequent call to `op` fail with `fault`.
    pub async fn inject_fault(&self, op: Operation, fault: Fault) {
        self.faults.write().await.insert(op, fault);
    }

    /// Remove a previously injected fault.
    pub async fn clear_fault(&self, op: Operation) {
        self.faults.write().await.remove(&op);
    }

    async fn check_fault(&self, op: Operation) -> Result<(), StorageError> {
        match self.faults.read().await.get(&op) {
            Some(fault) => Err(fault.to_error()),
            None => Ok(()),
        }
    }
}

impl StorageBackend for MemoryBackend {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn get_object(&self, key: &str) -> StorageFuture<'_, StoredObject> {
        let key = key.to_string();
        Box::pin(async move {
            self.check_fault(Operation::GetObject).await?;

            let objects = self.objects.read().await;
            let entry = objects
                .get(&key)
                .ok_or_else(|| StorageError::NoSuchKey { key: key.clone() })?;

            Ok(StoredObject {
                data: entry.data.clone(),
                content_type: entry
                    .content_type
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
                etag: None,
                last_modified: Some(entry.last_modified),
            })
        })
    }

    fn list_prefix(&self, prefix: &str) -> StorageFuture<'_, PrefixListing> {
        let prefix = prefix.to_string();
        Box::pin(async move {
            self.check_fault(Operation::ListPrefix).await?;

            let objects = self.objects.read().await;
            let mut listing = PrefixListing::default();
            let mut returned = 0usize;

            // Keys and common prefixes both count toward the page size,
            // matching ListObjectsV2.
            for key in objects.keys().filter(|k| k.starts_with(&prefix)) {
                let rest = &key[prefix.len()..];
                let (is_dir, name) = match rest.find('/') {
                    Some(idx) => (true, format!("{prefix}{}", &rest[..=idx])),
                    None => (false, key.clone()),
                };
                if is_dir && listing.directories.last() == Some(&name) {
                    continue;
                }
                if returned == self.list_max_keys {
                    listing.truncated = true;
                    break;
                }
                returned += 1;
                if is_dir {
                    listing.directories.push(name);
                } else {
                    listing.files.push(name);
                }
            }

            Ok(listing)
        })
    }

    fn head_bucket(&self) -> StorageFuture<'_, ()> {
        Box::pin(async move { self.check_fault(Operation::HeadBucket).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> MemoryBackend {
        let backend = MemoryBackend::new("test-bucket");
        backend
            .put("index.html", "<h1>home</h1>", Some("text/html"))
            .await;
        backend
            .put("images/logo.png", vec![0x89u8, 0x50], Some("image/png"))
            .await;
        backend.put("images/icon.png", vec![0x89u8], None).await;
        backend.put("images/raw/a.tif", "a", None).await;
        backend.put("images/raw/b.tif", "b", None).await;
        backend.put("images/thumbs/c.jpg", "c", None).await;
        backend
    }

    #[tokio::test]
    async fn test_get_existing_object() {
        let backend = seeded().await;
        let obj = backend.get_object("index.html").await.unwrap();
        assert_eq!(obj.data, Bytes::from_static(b"<h1>home</h1>"));
        assert_eq!(obj.content_type, "text/html");
        assert!(obj.last_modified.is_some());
    }

    #[tokio::test]
    async fn test_get_defaults_content_type() {
        let backend = seeded().await;
        let obj = backend.get_object("images/icon.png").await.unwrap();
        assert_eq!(obj.content_type, DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_get_missing_is_no_such_key() {
        let backend = seeded().await;
        match backend.get_object("missing.txt").await {
            Err(StorageError::NoSuchKey { key }) => assert_eq!(key, "missing.txt"),
            other => panic!("expected NoSuchKey, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let backend = seeded().await;
        backend.put("index.html", "v2", Some("text/plain")).await;
        let obj = backend.get_object("index.html").await.unwrap();
        assert_eq!(obj.data, Bytes::from_static(b"v2"));
        assert_eq!(obj.content_type, "text/plain");
    }

    #[tokio::test]
    async fn test_list_single_level() {
        let backend = seeded().await;
        let listing = backend.list_prefix("images/").await.unwrap();
        assert_eq!(listing.files, vec!["images/icon.png", "images/logo.png"]);
        assert_eq!(listing.directories, vec!["images/raw/", "images/thumbs/"]);
        assert!(!listing.truncated);
    }

    #[tokio::test]
    async fn test_list_root() {
        let backend = seeded().await;
        let listing = backend.list_prefix("").await.unwrap();
        assert_eq!(listing.files, vec!["index.html"]);
        assert_eq!(listing.directories, vec!["images/"]);
    }

    #[tokio::test]
    async fn test_list_unknown_prefix_is_empty() {
        let backend = seeded().await;
        let listing = backend.list_prefix("videos/").await.unwrap();
        assert!(listing.is_empty());
    }

    #[tokio::test]
    async fn test_list_does_not_match_partial_segment() {
        let backend = seeded().await;
        backend.put("imagesets/x.png", "x", None).await;
        let listing = backend.list_prefix("images/").await.unwrap();
        assert!(!listing.files.iter().any(|f| f.starts_with("imagesets")));
    }

    #[tokio::test]
    async fn test_list_truncates_at_page_size() {
        let backend = MemoryBackend::with_list_max_keys("b", 2);
        backend.put("d/1", "1", None).await;
        backend.put("d/2", "2", None).await;
        backend.put("d/3", "3", None).await;
        let listing = backend.list_prefix("d/").await.unwrap();
        assert_eq!(listing.files, vec!["d/1", "d/2"]);
        assert!(listing.truncated);
    }

    #[tokio::test]
    async fn test_injected_faults() {
        let backend = seeded().await;
        backend
            .inject_fault(Operation::GetObject, Fault::Service("SlowDown".into()))
            .await;
        backend
            .inject_fault(Operation::ListPrefix, Fault::Transport("reset".into()))
            .await;
        backend
            .inject_fault(Operation::HeadBucket, Fault::Service("AccessDenied".into()))
            .await;

        assert!(matches!(
            backend.get_object("index.html").await,
            Err(StorageError::Service(_))
        ));
        assert!(matches!(
            backend.list_prefix("images/").await,
            Err(StorageError::Transport(_))
        ));
        let err = backend.head_bucket().await.unwrap_err();
        assert_eq!(err.to_string(), "AccessDenied");

        backend.clear_fault(Operation::HeadBucket).await;
        assert!(backend.head_bucket().await.is_ok());
    }
}
