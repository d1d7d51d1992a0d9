// src/crawl/mod.rs
// =============================================================================
// This module is the crawl engine.
//
// Pieces, leaf first:
// - normalize: canonical string key for a URL
// - extract: outbound https links of a page, deduplicated within the page
// - frontier: bounded queue of pages waiting to be fetched
// - tracker: outstanding-work counter used to detect the end of the crawl
// - fetch / worker: the pool of workers fetching and parsing pages
// - aggregator: single consumer that deduplicates, applies the depth limit
//   and feeds new links back into the frontier
// - report: the writer that owns the crawl log
// - engine: starts all of the above and waits for them
// =============================================================================

mod aggregator;
mod config;
mod engine;
mod error;
mod extract;
mod fetch;
mod frontier;
mod normalize;
mod report;
mod tracker;
mod worker;

pub use aggregator::CrawlStats;
pub use config::{CrawlConfig, DEFAULT_MAX_BODY_BYTES, MAX_WORKERS};
pub use engine::Crawler;
