// src/logging.rs
// Diagnostics go to stderr through tracing; stdout is left to the crawl log.
// RUST_LOG overrides the default filter (e.g. RUST_LOG=link_crawler=debug).

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "link_crawler=info";

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
