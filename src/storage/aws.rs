//! AWS S3 storage backend.
//!
//! Reads objects and listings from a single S3 bucket.  Credentials are
//! resolved via the standard AWS credential chain (env vars,
//! `~/.aws/credentials`, IAM role, etc.); no keys are ever taken from
//! s3front's own configuration.

use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::Client;
use std::time::SystemTime;
use tracing::{debug, info};

use super::backend::{
    PrefixListing, StorageBackend, StorageError, StorageFuture, StoredObject,
    DEFAULT_CONTENT_TYPE,
};
use crate::config::StorageConfig;

/// Delimiter used to fold a flat key space into directories.
const DELIMITER: &str = "/";

/// Backend that reads from an AWS S3 (or S3-compatible) bucket.
pub struct S3Backend {
    /// AWS S3 SDK client.
    client: Client,
    /// The bucket being served.
    bucket: String,
    /// Page size for directory listings.
    list_max_keys: i32,
}

impl S3Backend {
    /// Create a new S3 backend from the storage section of the config.
    ///
    /// Resolves AWS credentials from the default credential chain up front,
    /// so a missing or broken chain fails here rather than on first request.
    pub async fn new(config: &StorageConfig) -> anyhow::Result<Self> {
        if config.bucket.is_empty() {
            anyhow::bail!("bucket name must not be empty");
        }

        let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        if let Some(ref endpoint) = config.endpoint_url {
            config_loader = config_loader.endpoint_url(endpoint);
        }

        let sdk_config = config_loader.load().await;

        resolve_credentials(sdk_config.credentials_provider()).await?;

        let s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.use_path_style);

        let client = Client::from_conf(s3_config_builder.build());

        info!(
            "S3 backend initialized: bucket={} region={} endpoint={}",
            config.bucket,
            config.region,
            config.endpoint_url.as_deref().unwrap_or("default")
        );

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            list_max_keys: config.list_max_keys,
        })
    }

    /// Map an AWS SDK error to a [`StorageError`].
    ///
    /// Errors the service actually answered with become `Service`; anything
    /// that never reached a service answer becomes `Transport`.
    fn map_sdk_error<E, R>(context: &str, err: SdkError<E, R>) -> StorageError
    where
        E: std::error::Error + ProvideErrorMetadata + 'static,
        R: std::fmt::Debug,
    {
        match err {
            SdkError::ServiceError(service) => {
                let service_err = service.into_err();
                // HEAD responses carry no body, so code/message can be absent.
                match (service_err.code(), service_err.message()) {
                    (Some(code), Some(message)) => StorageError::Service(anyhow::anyhow!(
                        "AWS S3 {context}: {code}: {message}"
                    )),
                    _ => StorageError::Service(anyhow::anyhow!(
                        "AWS S3 {context}: {}",
                        DisplayErrorContext(&service_err)
                    )),
                }
            }
            other => StorageError::Transport(anyhow::anyhow!(
                "AWS S3 {context}: {}",
                DisplayErrorContext(&other)
            )),
        }
    }
}

/// Ask the credentials provider for credentials once.
async fn resolve_credentials(provider: Option<SharedCredentialsProvider>) -> anyhow::Result<()> {
    let provider = provider
        .ok_or_else(|| anyhow::anyhow!("no AWS credentials provider available"))?;
    provider.provide_credentials().await.map_err(|e| {
        anyhow::anyhow!("failed to load AWS credentials: {}", DisplayErrorContext(&e))
    })?;
    Ok(())
}

impl StorageBackend for S3Backend {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn get_object(&self, key: &str) -> StorageFuture<'_, StoredObject> {
        let key = key.to_string();
        Box::pin(async move {
            debug!("AWS get_object: bucket={} key={}", self.bucket, key);

            let resp = match self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(SdkError::ServiceError(service)) if service.err().is_no_such_key() => {
                    return Err(StorageError::NoSuchKey { key });
                }
                Err(e) => return Err(Self::map_sdk_error("get_object", e)),
            };

            let content_type = resp
                .content_type()
                .filter(|ct| !ct.is_empty())
                .unwrap_or(DEFAULT_CONTENT_TYPE)
                .to_string();
            let etag = resp.e_tag().map(|s| s.to_string());
            let last_modified = resp
                .last_modified()
                .and_then(|dt| SystemTime::try_from(*dt).ok());

            let data = resp
                .body
                .collect()
                .await
                .map_err(|e| {
                    StorageError::Transport(anyhow::anyhow!("AWS S3 get_object body: {e}"))
                })?
                .into_bytes();

            Ok(StoredObject {
                data,
                content_type,
                etag,
                last_modified,
            })
        })
    }

    fn list_prefix(&self, prefix: &str) -> StorageFuture<'_, PrefixListing> {
        let prefix = prefix.to_string();
        Box::pin(async move {
            debug!(
                "AWS list_objects_v2: bucket={} prefix={} max_keys={}",
                self.bucket, prefix, self.list_max_keys
            );

            // Single page only; callers decide what to do with `truncated`.
            let resp = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&prefix)
                .delimiter(DELIMITER)
                .max_keys(self.list_max_keys)
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("list_objects_v2", e))?;

            let files = resp
                .contents()
                .iter()
                .filter_map(|obj| obj.key().map(|k| k.to_string()))
                .collect();
            let directories = resp
                .common_prefixes()
                .iter()
                .filter_map(|cp| cp.prefix().map(|p| p.to_string()))
                .collect();

            Ok(PrefixListing {
                directories,
                files,
                truncated: resp.is_truncated() == Some(true),
            })
        })
    }

    fn head_bucket(&self) -> StorageFuture<'_, ()> {
        Box::pin(async move {
            debug!("AWS head_bucket: bucket={}", self.bucket);

            self.client
                .head_bucket()
                .bucket(&self.bucket)
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("head_bucket", e))?;

            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_credential_types::provider::error::CredentialsError;
    use aws_credential_types::provider::future;
    use aws_credential_types::Credentials;

    fn local_config() -> StorageConfig {
        StorageConfig {
            bucket: "test-bucket".to_string(),
            region: "us-east-1".to_string(),
            endpoint_url: Some("http://127.0.0.1:1".to_string()),
            use_path_style: true,
            list_max_keys: 10,
        }
    }

    #[tokio::test]
    async fn test_new_rejects_empty_bucket() {
        let mut config = local_config();
        config.bucket.clear();
        let err = S3Backend::new(&config).await.err().unwrap();
        assert!(err.to_string().contains("bucket"));
    }

    #[derive(Debug)]
    struct NoCredentials;

    impl ProvideCredentials for NoCredentials {
        fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
        where
            Self: 'a,
        {
            future::ProvideCredentials::ready(Err(CredentialsError::not_loaded(
                "no providers in chain",
            )))
        }
    }

    #[tokio::test]
    async fn test_resolve_credentials() {
        let static_creds = Credentials::new("AKID", "SECRET", None, None, "test");
        resolve_credentials(Some(SharedCredentialsProvider::new(static_creds)))
            .await
            .unwrap();

        let err = resolve_credentials(Some(SharedCredentialsProvider::new(NoCredentials)))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("failed to load AWS credentials"));

        let err = resolve_credentials(None).await.unwrap_err();
        assert!(err.to_string().contains("no AWS credentials provider"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        // Static credentials so the test never depends on the host's chain.
        std::env::set_var("AWS_ACCESS_KEY_ID", "test");
        std::env::set_var("AWS_SECRET_ACCESS_KEY", "test");

        let backend = S3Backend::new(&local_config()).await.unwrap();
        assert_eq!(backend.bucket(), "test-bucket");

        match backend.get_object("index.html").await {
            Err(StorageError::Transport(e)) => {
                assert!(e.to_string().starts_with("AWS S3 get_object"))
            }
            other => panic!("expected transport error, got {other:?}"),
        }
        assert!(matches!(
            backend.head_bucket().await,
            Err(StorageError::Transport(_))
        ));
    }
}
