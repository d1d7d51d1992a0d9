// src/crawl/aggregator.rs
// =============================================================================
// The aggregator: the single consumer of worker reports.
//
// For every report, strictly one at a time:
// 1. Mark the page as visited
// 2. Write its record to the crawl log
// 3. Offer each child (in extraction order) to the frontier, if it hasn't
//    been visited and the parent is above the depth limit
// 4. Resolve the item in the outstanding counter
// 5. Stop once nothing is outstanding
//
// The visited set lives here and nowhere else. Because reports are handled
// one by one, checking and marking a URL can never race with another
// report, and a URL enters the frontier at most once per crawl.
//
// Children are marked visited the moment they are enqueued, not when they
// are fetched, so two pages linking to the same URL only queue it once.
//
// Backpressure: pushes never wait. If the frontier is full the child is
// dropped and logged. The crawl trades completeness for bounded memory.
// =============================================================================

use std::collections::HashSet;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::frontier::{FrontierProducer, PushError, WorkItem};
use super::report::{PageRecord, Reporter, WriterStopped};
use super::tracker::Outstanding;
use super::worker::{CrawlResult, Report};

/// Depth of the seed page
pub const SEED_DEPTH: usize = 1;

/// Totals for a finished crawl
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    /// Pages fetched and parsed
    pub pages_crawled: usize,
    /// Pages whose fetch or parse failed
    pub pages_failed: usize,
    /// Items pushed onto the frontier, seed included
    pub links_enqueued: usize,
    /// New links lost because the frontier was full
    pub links_dropped: usize,
    /// True when the crawl was stopped before running out of work
    pub cancelled: bool,
}

pub struct Aggregator {
    max_depth: usize, // 0 = unlimited
    frontier: FrontierProducer,
    outstanding: Outstanding,
    reporter: Reporter,
    visited: HashSet<String>,
    stats: CrawlStats,
}

impl Aggregator {
    pub fn new(
        max_depth: usize,
        frontier: FrontierProducer,
        outstanding: Outstanding,
        reporter: Reporter,
    ) -> Self {
        Self {
            max_depth,
            frontier,
            outstanding,
            reporter,
            visited: HashSet::new(),
            stats: CrawlStats::default(),
        }
    }

    // Queues the starting page
    //
    // Returns false if it could not be queued (only possible when no worker
    // is left to take it).
    pub fn seed(&mut self, url: String) -> bool {
        self.enqueue(WorkItem {
            url,
            depth: SEED_DEPTH,
        })
    }

    // Handles reports until nothing is outstanding, the workers are gone, or
    // the crawl is cancelled
    //
    // Consumes the aggregator; dropping its frontier producer on return is
    // what tells idle workers to exit.
    pub async fn run(
        mut self,
        mut results: mpsc::Receiver<Report>,
        cancel: CancellationToken,
    ) -> CrawlStats {
        while self.outstanding.count() > 0 {
            let report = tokio::select! {
                _ = cancel.cancelled() => {
                    self.stats.cancelled = true;
                    break;
                }
                report = results.recv() => match report {
                    Some(report) => report,
                    None => break,
                },
            };

            match self.handle(report).await {
                Ok(0) => {
                    debug!("no outstanding work left");
                    break;
                }
                Ok(_) => {}
                Err(WriterStopped) => {
                    warn!("crawl log can no longer be written, stopping crawl");
                    break;
                }
            }
        }

        self.stats
    }

    // Processes one report and returns the outstanding count afterwards
    //
    // Fails if the page record could not be handed to the log writer; the
    // page's children are not queued in that case.
    async fn handle(&mut self, report: Report) -> Result<usize, WriterStopped> {
        match report {
            Report::Crawled(result) => self.handle_page(result).await?,
            Report::Failed { .. } => {
                // Already logged by the worker; the item is a leaf
                self.stats.pages_failed += 1;
            }
        }

        Ok(self.outstanding.done())
    }

    async fn handle_page(&mut self, result: CrawlResult) -> Result<(), WriterStopped> {
        self.visited.insert(result.source_url.clone());
        self.stats.pages_crawled += 1;

        self.reporter
            .page(PageRecord {
                url: result.source_url,
                depth: result.depth,
                children: result.child_urls.clone(),
            })
            .await?;

        if !self.can_descend(result.depth) {
            return Ok(());
        }

        for child in result.child_urls {
            if self.visited.contains(&child) {
                continue;
            }
            self.enqueue(WorkItem {
                url: child,
                depth: result.depth + 1,
            });
        }
        Ok(())
    }

    fn can_descend(&self, depth: usize) -> bool {
        self.max_depth == 0 || depth < self.max_depth
    }

    // Non-blocking push; on success the item is counted and marked visited
    fn enqueue(&mut self, item: WorkItem) -> bool {
        let url = item.url.clone();
        match self.frontier.try_push(item) {
            Ok(()) => {
                self.outstanding.add();
                self.visited.insert(url);
                self.stats.links_enqueued += 1;
                true
            }
            Err(PushError::Full(item)) => {
                warn!(url = %item.url, depth = item.depth, "frontier is full, discarding URL");
                self.stats.links_dropped += 1;
                false
            }
            Err(PushError::Closed(item)) => {
                debug!(url = %item.url, "frontier closed, discarding URL");
                false
            }
        }
    }
}
