// src/crawl/engine.rs
// =============================================================================
// Wires the crawl together.
//
//   seed -> frontier -> workers (fetch + extract) -> aggregator
//                ^                                      |
//                +------------- new links --------------+
//
// The driver here:
// 1. Parses and normalizes the seed (a bad seed is fatal)
// 2. Starts the report writer, the aggregator and the worker pool
// 3. Waits until the outstanding counter hits zero or the crawl is cancelled
// 4. Joins everything and returns the totals
// =============================================================================

use std::io::Write;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::aggregator::{Aggregator, CrawlStats};
use super::config::CrawlConfig;
use super::error::Result;
use super::fetch::{Fetcher, HttpFetcher};
use super::frontier::{channel_capacity, frontier};
use super::normalize::{normalize, parse_seed};
use super::report::Reporter;
use super::tracker::Outstanding;
use super::worker::run_worker;

pub struct Crawler {
    config: CrawlConfig,
    fetcher: Arc<dyn Fetcher>,
}

impl Crawler {
    /// Crawler that fetches over HTTP
    pub fn new(config: CrawlConfig) -> Result<Self> {
        let fetcher =
            HttpFetcher::new(config.fetch_timeout, &config.user_agent, config.max_body_bytes)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    /// Crawler using any page source
    pub fn with_fetcher(config: CrawlConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { config, fetcher }
    }

    // Crawls from `seed`, writing the page log to `out`
    //
    // Returns once every reachable page within the depth limit has been
    // resolved, or once `cancel` fires.
    pub async fn run<W>(&self, seed: &str, out: W, cancel: CancellationToken) -> Result<CrawlStats>
    where
        W: Write + Send + 'static,
    {
        let seed = normalize(&parse_seed(seed)?);
        let config = &self.config;

        info!("Max depth set to {}", config.max_depth);
        if config.is_unlimited() {
            warn!("No max depth specified, crawl may not terminate");
        }
        info!("Number of workers set to {}", config.workers);
        debug!(capacity = config.queue_capacity, "frontier capacity");

        let (producer, consumer) = frontier(config.queue_capacity);
        let (results_tx, results_rx) = mpsc::channel(channel_capacity(config.workers));
        let outstanding = Outstanding::new();
        let (reporter, writer) = Reporter::spawn(out);

        let mut aggregator =
            Aggregator::new(config.max_depth, producer, outstanding.clone(), reporter);
        if !aggregator.seed(seed.clone()) {
            warn!(url = %seed, "could not queue seed URL");
        }

        // Cancelled by the caller, or by us once the aggregator is gone so
        // workers stuck in a fetch don't hold up the return
        let stop = cancel.child_token();

        let workers: Vec<_> = (0..config.workers)
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    self.fetcher.clone(),
                    consumer.clone(),
                    results_tx.clone(),
                    stop.clone(),
                ))
            })
            .collect();
        // Only the workers may hold these, so their exit is observable
        drop(consumer);
        drop(results_tx);

        // Fires when the aggregator task ends for any reason, panics included
        let finished = CancellationToken::new();
        let aggregator = {
            let guard = finished.clone().drop_guard();
            let stop = stop.clone();
            tokio::spawn(async move {
                let _guard = guard;
                aggregator.run(results_rx, stop).await
            })
        };

        tokio::select! {
            _ = outstanding.wait_idle() => info!("No more URLs to crawl, ending crawl"),
            _ = cancel.cancelled() => warn!("Crawl cancelled, shutting down"),
            _ = finished.cancelled() => debug!("aggregator stopped"),
        }

        let stats = aggregator.await?;
        stop.cancel();

        for joined in join_all(workers).await {
            if let Err(e) = joined {
                error!("worker task failed: {}", e);
            }
        }

        // An output failure ends the crawl early and is reported here
        writer.await??;

        info!(
            crawled = stats.pages_crawled,
            failed = stats.pages_failed,
            dropped = stats.links_dropped,
            "crawl finished"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::error::CrawlError;
    use crate::crawl::report::tests::{ClosedPipe, SharedBuf};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    // A small in-memory web: URL -> HTML. Unknown URLs are 404s.
    #[derive(Default)]
    struct FakeSite {
        pages: HashMap<String, String>,
        fetched: Mutex<Vec<String>>,
    }

    impl FakeSite {
        fn page(mut self, url: &str, links: &[&str]) -> Self {
            let html = links
                .iter()
                .map(|link| format!(r#"<a href="{}">x</a>"#, link))
                .collect::<String>();
            self.pages.insert(url.to_string(), html);
            self
        }

        fn fetched(&self) -> Vec<String> {
            let mut fetched = self.fetched.lock().unwrap().clone();
            fetched.sort();
            fetched
        }
    }

    #[async_trait]
    impl Fetcher for FakeSite {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.fetched.lock().unwrap().push(url.to_string());
            match self.pages.get(url) {
                Some(html) => Ok(html.clone().into_bytes()),
                None => Err(CrawlError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    // Hangs forever on every request
    struct StuckFetcher;

    #[async_trait]
    impl Fetcher for StuckFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            std::future::pending().await
        }
    }

    // https://p0.com -> https://p1.com -> ... -> https://p50.com, 20ms per page
    #[derive(Default)]
    struct SlowChain {
        fetched: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Fetcher for SlowChain {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.fetched.lock().unwrap().push(url.to_string());
            tokio::time::sleep(Duration::from_millis(20)).await;
            let n: usize = url
                .trim_start_matches("https://p")
                .trim_end_matches(".com")
                .parse()
                .unwrap_or(50);
            if n >= 50 {
                return Ok(Vec::new());
            }
            Ok(format!(r#"<a href="https://p{}.com">next</a>"#, n + 1).into_bytes())
        }
    }

    async fn crawl(site: Arc<FakeSite>, config: CrawlConfig, seed: &str) -> (CrawlStats, String) {
        let buf = SharedBuf::default();
        let crawler = Crawler::with_fetcher(config, site);
        let stats = tokio::time::timeout(
            Duration::from_secs(5),
            crawler.run(seed, buf.clone(), CancellationToken::new()),
        )
        .await
        .expect("crawl should terminate")
        .unwrap();
        (stats, buf.contents())
    }

    #[tokio::test]
    async fn test_cyclic_site_terminates_with_unlimited_depth() {
        let site = Arc::new(
            FakeSite::default()
                .page("https://a.com", &["https://b.com", "https://c.com/"])
                .page("https://b.com", &["https://a.com", "https://c.com"])
                .page("https://c.com", &["https://a.com/?q=1", "https://b.com#top"]),
        );

        let (stats, _) = crawl(site.clone(), CrawlConfig::new(0, 4), "a.com").await;

        assert_eq!(site.fetched(), vec!["https://a.com", "https://b.com", "https://c.com"]);
        assert_eq!(stats.pages_crawled, 3);
        assert_eq!(stats.pages_failed, 0);
        assert_eq!(stats.links_enqueued, 3);
        assert!(!stats.cancelled);
    }

    #[tokio::test]
    async fn test_depth_limit_stops_descent() {
        let site = Arc::new(
            FakeSite::default()
                .page("https://a.com", &["https://b.com"])
                .page("https://b.com", &["https://c.com"])
                .page("https://c.com", &["https://d.com"])
                .page("https://d.com", &[]),
        );

        let (stats, log) = crawl(site.clone(), CrawlConfig::new(2, 2), "https://a.com").await;

        assert_eq!(site.fetched(), vec!["https://a.com", "https://b.com"]);
        assert_eq!(stats.pages_crawled, 2);
        assert!(log.contains("https://a.com (depth 1)\n    https://b.com\n"));
        assert!(log.contains("https://b.com (depth 2)\n    https://c.com\n"));
    }

    #[tokio::test]
    async fn test_failed_pages_become_leaves() {
        let site = Arc::new(
            FakeSite::default()
                .page("https://a.com", &["https://missing.com", "https://b.com"])
                .page("https://b.com", &[]),
        );

        let (stats, log) = crawl(site.clone(), CrawlConfig::new(3, 3), "https://a.com").await;

        assert_eq!(stats.pages_crawled, 2);
        assert_eq!(stats.pages_failed, 1);
        assert!(!log.contains("https://missing.com (depth"));
    }

    #[tokio::test]
    async fn test_seed_failure_still_terminates() {
        let site = Arc::new(FakeSite::default());
        let (stats, log) = crawl(site, CrawlConfig::new(3, 1), "https://nowhere.com").await;

        assert_eq!(stats.pages_failed, 1);
        assert_eq!(stats.pages_crawled, 0);
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_full_frontier_drops_links_but_finishes() {
        let site = Arc::new(
            FakeSite::default()
                .page(
                    "https://a.com",
                    &["https://b.com", "https://c.com", "https://d.com", "https://e.com"],
                )
                .page("https://b.com", &[])
                .page("https://c.com", &[])
                .page("https://d.com", &[])
                .page("https://e.com", &[]),
        );

        // One slot, and the single worker can't take anything until the
        // aggregator is done with a.com's links
        let config = CrawlConfig::new(2, 1).with_queue_capacity(1);
        let (stats, _) = crawl(site, config, "https://a.com").await;

        assert_eq!(stats.links_dropped, 3);
        assert_eq!(stats.pages_crawled, 2);
    }

    #[tokio::test]
    async fn test_unbounded_queue_capacity_is_accepted() {
        let site = Arc::new(
            FakeSite::default()
                .page("https://a.com", &["https://b.com"])
                .page("https://b.com", &[]),
        );

        let config = CrawlConfig::new(2, 2).with_queue_capacity(usize::MAX);
        let (stats, _) = crawl(site, config, "https://a.com").await;

        assert_eq!(stats.pages_crawled, 2);
    }

    #[tokio::test]
    async fn test_invalid_seed_is_fatal() {
        let crawler = Crawler::with_fetcher(CrawlConfig::new(1, 1), Arc::new(FakeSite::default()));
        let err = crawler
            .run("mailto:me@foo.com", std::io::sink(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::SeedWithoutHost(_)));
    }

    #[tokio::test]
    async fn test_output_failure_ends_the_crawl() {
        let site = Arc::new(SlowChain::default());
        let crawler = Crawler::with_fetcher(CrawlConfig::new(0, 2), site.clone());

        let err = tokio::time::timeout(
            Duration::from_secs(5),
            crawler.run("https://p0.com", ClosedPipe, CancellationToken::new()),
        )
        .await
        .expect("a dead output should end the crawl")
        .unwrap_err();

        assert!(matches!(err, CrawlError::Output(_)));
        // The whole chain is 51 pages; only the first few get fetched
        assert!(site.fetched.lock().unwrap().len() < 10);
    }

    #[tokio::test]
    async fn test_cancel_stops_a_stuck_crawl() {
        let crawler = Crawler::with_fetcher(CrawlConfig::new(0, 2), Arc::new(StuckFetcher));
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                cancel.cancel();
            })
        };

        let stats = tokio::time::timeout(
            Duration::from_secs(5),
            crawler.run("https://a.com", std::io::sink(), cancel),
        )
        .await
        .expect("cancel should end the crawl")
        .unwrap();

        canceller.await.unwrap();
        assert!(stats.cancelled);
        assert_eq!(stats.pages_crawled, 0);
    }
}
