// src/cli.rs
// =============================================================================
// Command-line interface, defined with clap's derive API.
//
//   link-crawler --url https://example.com --depth 2 --workers 20
//
// Missing --url makes clap print usage and exit with a non-zero status.
// =============================================================================

use std::time::Duration;

use clap::Parser;

use crate::crawl::{CrawlConfig, DEFAULT_MAX_BODY_BYTES, MAX_WORKERS};

#[derive(Parser, Debug)]
#[command(
    name = "link-crawler",
    version,
    about = "Crawl the web from a starting URL, following absolute https links",
    long_about = "link-crawler fetches a starting page, extracts its absolute https links and \
                  keeps following them with a pool of concurrent workers until the depth limit \
                  is reached. Each crawled page is printed with the links found on it."
)]
pub struct Cli {
    /// URL to begin crawling from (e.g. https://example.com or example.com)
    #[arg(long)]
    pub url: String,

    /// Max depth for crawling, the starting page being depth 1
    ///
    /// Set to 0 for no max depth. The crawl may then never finish.
    #[arg(long, default_value_t = 3)]
    pub depth: usize,

    /// Number of concurrent workers
    ///
    /// 0 picks a pool size from the depth (10^(depth-1), capped at 1000).
    #[arg(
        long,
        default_value_t = 0,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(0..=MAX_WORKERS as u64)
    )]
    pub workers: usize,

    /// How many pages may wait to be fetched before new links are dropped
    ///
    /// 0 reserves 1000 slots per worker.
    #[arg(long, default_value_t = 0)]
    pub queue_capacity: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,

    /// Pages larger than this many bytes count as failed fetches
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_page_bytes: usize,

    /// Print the end-of-crawl summary as JSON
    ///
    /// stdout then carries only the JSON; the page log moves to stderr.
    #[arg(long)]
    pub json: bool,
}

/// Where the page log is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLog {
    Stdout,
    Stderr,
}

impl Cli {
    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig::new(self.depth, self.workers)
            .with_queue_capacity(self.queue_capacity)
            .with_fetch_timeout(Duration::from_secs(self.timeout))
            .with_max_body_bytes(self.max_page_bytes)
    }

    // Keeps stdout parseable when it has to carry JSON
    pub fn page_log(&self) -> PageLog {
        if self.json {
            PageLog::Stderr
        } else {
            PageLog::Stdout
        }
    }
}
