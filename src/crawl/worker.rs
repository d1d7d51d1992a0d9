// src/crawl/worker.rs
// =============================================================================
// The worker pool.
//
// Each worker loops:
// 1. Take the next item from the frontier (waits while it's empty)
// 2. Fetch the page and parse it
// 3. Extract its links
// 4. Send a Report to the aggregator
//
// A failed fetch or parse still produces a Report, so the aggregator can
// resolve the item and the outstanding counter stays exact. Failures are
// never retried.
//
// Workers stop when the frontier is closed and drained, when the aggregator
// has gone away, or when the crawl is cancelled.
// =============================================================================

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::CrawlError;
use super::extract::{extract_links, parse_document};
use super::fetch::{failure_kind, Fetcher};
use super::frontier::{FrontierConsumer, WorkItem};

/// A page that was fetched and parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlResult {
    pub source_url: String,
    pub child_urls: Vec<String>, // normalized, deduplicated, in document order
    pub depth: usize,
}

/// What a worker hands back for each item it took off the frontier
#[derive(Debug)]
pub enum Report {
    Crawled(CrawlResult),
    Failed { item: WorkItem, error: CrawlError },
}

// Fetches, parses and extracts one page
pub async fn crawl_page(fetcher: &dyn Fetcher, item: WorkItem) -> Report {
    let body = match fetcher.fetch(&item.url).await {
        Ok(body) => body,
        Err(error) => return Report::Failed { item, error },
    };

    // The DOM isn't Send, so it must not live across an await point
    let child_urls = match parse_document(&item.url, &body) {
        Ok(document) => extract_links(&document),
        Err(error) => return Report::Failed { item, error },
    };

    Report::Crawled(CrawlResult {
        source_url: item.url,
        child_urls,
        depth: item.depth,
    })
}

// Runs one worker until there is nothing left to do
pub async fn run_worker(
    id: usize,
    fetcher: Arc<dyn Fetcher>,
    frontier: FrontierConsumer,
    results: mpsc::Sender<Report>,
    cancel: CancellationToken,
) {
    loop {
        let item = tokio::select! {
            _ = cancel.cancelled() => break,
            item = frontier.pop() => match item {
                Some(item) => item,
                None => break,
            },
        };

        debug!(worker = id, url = %item.url, depth = item.depth, "fetching");

        let report = tokio::select! {
            _ = cancel.cancelled() => break,
            report = crawl_page(fetcher.as_ref(), item) => report,
        };

        if let Report::Failed { item, error } = &report {
            warn!(
                worker = id,
                url = %item.url,
                kind = failure_kind(error),
                "page failed: {}",
                error
            );
        }

        if results.send(report).await.is_err() {
            // Aggregator is gone; nobody will read anything we produce
            break;
        }
    }

    debug!(worker = id, "worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::frontier::frontier;
    use async_trait::async_trait;

    // Serves a fixed body for every URL, or fails every request
    struct StaticFetcher(Option<&'static str>);

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> crate::crawl::error::Result<Vec<u8>> {
            match self.0 {
                Some(body) => Ok(body.as_bytes().to_vec()),
                None => Err(CrawlError::Status {
                    url: url.to_string(),
                    status: 500,
                }),
            }
        }
    }

    fn item(url: &str, depth: usize) -> WorkItem {
        WorkItem {
            url: url.to_string(),
            depth,
        }
    }

    #[tokio::test]
    async fn test_crawl_page_extracts_links() {
        let fetcher = StaticFetcher(Some(
            r#"<a href="https://a.com/">a</a><a href="/rel">r</a><a href="https://b.com">b</a>"#,
        ));

        let report = crawl_page(&fetcher, item("https://foo.com", 2)).await;
        match report {
            Report::Crawled(result) => assert_eq!(
                result,
                CrawlResult {
                    source_url: "https://foo.com".to_string(),
                    child_urls: vec!["https://a.com".to_string(), "https://b.com".to_string()],
                    depth: 2,
                }
            ),
            other => panic!("expected a crawled page, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_crawl_page_reports_fetch_failure() {
        let report = crawl_page(&StaticFetcher(None), item("https://foo.com", 1)).await;
        assert!(matches!(
            report,
            Report::Failed { error: CrawlError::Status { status: 500, .. }, .. }
        ));
    }

    #[tokio::test]
    async fn test_worker_drains_frontier_then_exits() {
        let (producer, consumer) = frontier(8);
        let (tx, mut rx) = mpsc::channel(8);

        producer.try_push(item("https://a.com", 1)).unwrap();
        producer.try_push(item("https://b.com", 1)).unwrap();
        drop(producer);

        let fetcher: Arc<dyn Fetcher> = Arc::new(StaticFetcher(None));
        run_worker(0, fetcher, consumer, tx, CancellationToken::new()).await;

        let mut failed = Vec::new();
        while let Some(report) = rx.recv().await {
            if let Report::Failed { item, .. } = report {
                failed.push(item.url);
            }
        }
        assert_eq!(failed, vec!["https://a.com", "https://b.com"]);
    }

    #[tokio::test]
    async fn test_worker_stops_on_cancel() {
        let (_producer, consumer) = frontier(1);
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let fetcher: Arc<dyn Fetcher> = Arc::new(StaticFetcher(Some("")));
        // Would wait forever on the empty frontier without the cancel
        run_worker(0, fetcher, consumer, tx, cancel).await;
    }
}
