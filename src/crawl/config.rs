// src/crawl/config.rs
// =============================================================================
// Crawl settings.
//
// Only a few knobs matter:
// - max_depth: how many hops from the seed to fetch (0 = no limit)
// - workers: size of the fetch pool, fixed for the whole crawl
// - queue_capacity: how many pages may wait in the frontier before new
//   links start getting dropped
// - fetch_timeout: upper bound on a single request
// - max_body_bytes: pages larger than this are treated as failed fetches
// =============================================================================

use std::time::Duration;

/// Upper bound on the worker pool, requested or derived
pub const MAX_WORKERS: usize = 1000;

/// Frontier slots reserved per worker when no capacity is given
pub const QUEUE_SLOTS_PER_WORKER: usize = 1000;

pub const DEFAULT_MAX_DEPTH: usize = 3;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlConfig {
    pub max_depth: usize,
    pub workers: usize,
    pub queue_capacity: usize,
    pub fetch_timeout: Duration,
    pub max_body_bytes: usize,
    pub user_agent: String,
}

impl CrawlConfig {
    // Settings for a crawl of `max_depth` with `workers` workers
    //
    // workers == 0 picks a pool size from the depth. Larger requests than
    // MAX_WORKERS are cut down to it.
    pub fn new(max_depth: usize, workers: usize) -> Self {
        let workers = if workers == 0 {
            recommended_workers(max_depth)
        } else {
            workers.min(MAX_WORKERS)
        };

        Self {
            max_depth,
            workers,
            queue_capacity: workers.saturating_mul(QUEUE_SLOTS_PER_WORKER),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Overrides the frontier capacity; 0 keeps the derived one
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        if capacity > 0 {
            self.queue_capacity = capacity;
        }
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_depth == 0
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH, 0)
    }
}

// Picks a pool size for a crawl depth
//
// Reachable pages grow roughly geometrically with depth, so the pool does
// too: 1 worker at depth 1, 10 at depth 2, 100 at depth 3, ... capped at
// MAX_WORKERS. Unlimited crawls get the cap.
pub fn recommended_workers(max_depth: usize) -> usize {
    if max_depth == 0 {
        return MAX_WORKERS;
    }

    let exponent = u32::try_from(max_depth - 1).unwrap_or(u32::MAX);
    10usize
        .checked_pow(exponent)
        .map_or(MAX_WORKERS, |n| n.min(MAX_WORKERS))
}
