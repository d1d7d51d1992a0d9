// src/crawl/error.rs
// =============================================================================
// Error types for the crawl engine.
//
// Only seed problems, HTTP client construction and a crawl log that can't be
// written are fatal. Everything that happens to a single page (transport
// failure, bad status, oversized or undecodable body) turns that page into a
// leaf: it is logged and the crawl keeps going.
// =============================================================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrawlError {
    /// The seed URL could not be parsed at all
    #[error("invalid seed URL '{url}': {source}")]
    InvalidSeed {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The seed URL parsed but has nothing to fetch (e.g. "mailto:me@foo.com")
    #[error("seed URL '{0}' has no host")]
    SeedWithoutHost(String),

    /// The HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Network/transport failure while fetching a page
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The body was larger than the configured limit
    #[error("{url} is larger than the {limit} byte page limit")]
    BodyTooLarge { url: String, limit: usize },

    /// The server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The body could not be turned into a document
    #[error("failed to parse document at {url}: {reason}")]
    Parse { url: String, reason: String },

    /// The crawl log could not be written
    #[error("failed to write crawl log: {0}")]
    Output(#[from] std::io::Error),

    /// A crawl task panicked or was aborted
    #[error("crawl task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, CrawlError>;
