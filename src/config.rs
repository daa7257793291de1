//! Configuration loading and types for s3front.
//!
//! Configuration comes from an optional YAML file deserialized into the
//! [`Config`] struct, with environment variables layered on top.  Every
//! section has defaults, so running with no file and no environment
//! serves `my-private-bucket` in `us-east-1` on port 8080.

use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream bucket settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Observability settings.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind host address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// The single bucket being served.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Bucket name.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// AWS region.
    #[serde(default = "default_region")]
    pub region: String,

    /// Custom S3-compatible endpoint (e.g. MinIO, LocalStack).
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// Force path-style URL addressing.
    #[serde(default)]
    pub use_path_style: bool,

    /// Upper bound on entries returned by a directory listing.
    #[serde(default = "default_list_max_keys")]
    pub list_max_keys: i32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            region: default_region(),
            endpoint_url: None,
            use_path_style: false,
            list_max_keys: default_list_max_keys(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or text.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Enable Prometheus metrics collection and the `/metrics` endpoint.
    #[serde(default = "default_true")]
    pub metrics: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { metrics: true }
    }
}

// -- Defaults ----------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_bucket() -> String {
    "my-private-bucket".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_list_max_keys() -> i32 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

// -- Environment overrides ---------------------------------------------------

/// Apply environment overrides using `lookup` to read variables.
///
/// `BUCKET_NAME` wins over `S3_BUCKET_NAME`, and `REGION` over `AWS_REGION`.
/// Setting `S3_ENDPOINT_URL` also switches to path-style addressing, which
/// is what LocalStack and MinIO expect.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(bucket) = non_empty("BUCKET_NAME").or_else(|| non_empty("S3_BUCKET_NAME")) {
        config.storage.bucket = bucket;
    }
    if let Some(region) = non_empty("REGION").or_else(|| non_empty("AWS_REGION")) {
        config.storage.region = region;
    }
    if let Some(endpoint) = non_empty("S3_ENDPOINT_URL") {
        config.storage.endpoint_url = Some(endpoint);
        config.storage.use_path_style = true;
    }
    if let Some(port) = non_empty("PORT") {
        config.server.port = port
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid PORT value `{port}`: {e}"))?;
    }
    if let Some(format) = non_empty("LOG_FORMAT") {
        config.logging.format = format;
    }
    Ok(())
}

// -- Loader ------------------------------------------------------------------

/// Load configuration from an optional YAML file, then apply the process
/// environment on top.
pub fn load_config<P: AsRef<Path>>(path: Option<P>) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path.as_ref())?;
            serde_yaml::from_str(&contents)?
        }
        None => Config::default(),
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate(&config)?;
    Ok(config)
}

/// Reject configurations the server cannot run with.
fn validate(config: &Config) -> anyhow::Result<()> {
    if config.storage.bucket.trim().is_empty() {
        anyhow::bail!("storage.bucket must not be empty");
    }
    if config.storage.list_max_keys <= 0 {
        anyhow::bail!("storage.list_max_keys must be positive");
    }
    match config.logging.format.as_str() {
        "json" | "text" => Ok(()),
        other => anyhow::bail!("logging.format must be `json` or `text`, got `{other}`"),
    }
}
