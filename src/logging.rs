//! Tracing subscriber setup.
//!
//! `json` output puts each event on one line with its fields flattened to
//! the top level, alongside `timestamp`, `level`, `target` (the module),
//! `filename` and `line_number`.

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Build the JSON subscriber writing to `writer`.
pub fn json_subscriber<W>(filter: EnvFilter, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_span_list(false)
        .with_file(true)
        .with_line_number(true)
        .with_env_filter(filter)
        .with_writer(writer)
        .finish()
}

/// Install the global subscriber.  `RUST_LOG` overrides the configured level.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.format == "json" {
        json_subscriber(filter, std::io::stdout).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
