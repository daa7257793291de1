//! s3front -- HTTP front end for a private S3 bucket.
//!
//! Startup is all-or-nothing: if the configuration cannot be loaded or the
//! storage client cannot be built, the process logs the failure and exits
//! non-zero instead of serving errors.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

/// Command-line arguments for the s3front server.
#[derive(Parser, Debug)]
#[command(
    name = "s3front",
    version,
    about = "Serve a private S3 bucket as a static file tree"
)]
struct Cli {
    /// Path to an optional YAML configuration file.
    #[arg(short, long)]
    config: Option<String>,

    /// Override the bind address (host:port).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = s3front::config::load_config(cli.config.as_deref())?;
    s3front::logging::init_tracing(&config.logging);

    let bind_addr = cli
        .bind
        .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));

    // Build the storage client once; every request shares it.
    let storage: Arc<dyn s3front::storage::backend::StorageBackend> =
        match s3front::storage::aws::S3Backend::new(&config.storage).await {
            Ok(backend) => {
                info!(
                    event = "initialization",
                    bucket = %config.storage.bucket,
                    region = %config.storage.region,
                    "Storage client initialized"
                );
                Arc::new(backend)
            }
            Err(e) => {
                error!(
                    event = "initialization_failed",
                    error = %e,
                    "Storage client initialization failed"
                );
                return Err(e);
            }
        };

    if config.observability.metrics {
        s3front::metrics::init_metrics();
        s3front::metrics::describe_metrics();
        info!("Prometheus metrics initialized");
    }

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout);
    let state = Arc::new(s3front::AppState { config, storage });
    let app = s3front::server::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("s3front listening on {}", bind_addr);

    // On SIGTERM/SIGINT stop accepting connections and let in-flight
    // requests finish, but no longer than the configured timeout.
    let shutdown = Arc::new(tokio::sync::Notify::new());
    let signalled = shutdown.clone();
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        signalled.notify_one();
    })
    .into_future();

    tokio::select! {
        result = server => result?,
        _ = async {
            shutdown.notified().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            warn!(
                "In-flight requests still running after {}s, exiting",
                shutdown_timeout.as_secs()
            );
        }
    }

    info!("s3front shut down");

    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C), then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        },
    }
}
