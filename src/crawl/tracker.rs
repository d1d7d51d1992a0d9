// src/crawl/tracker.rs
// =============================================================================
// Termination detection.
//
// The crawl has no fixed work list: one page can produce zero, one or many
// new pages. The only reliable "we're done" signal is a counter of work items
// that were enqueued but not yet resolved:
// - +1 every time an item enters the frontier
// - -1 every time the aggregator finishes with an item's outcome (success
//   or failure)
// When it drops to zero nothing is in flight and nothing can create more work.
// =============================================================================

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Clone, Default)]
pub struct Outstanding {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    count: AtomicUsize,
    idle: Notify,
}

impl Outstanding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one newly enqueued item
    pub fn add(&self) {
        self.inner.count.fetch_add(1, Ordering::SeqCst);
    }

    /// Records one resolved item and returns how many are still outstanding
    pub fn done(&self) -> usize {
        let previous = self
            .inner
            .count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .unwrap_or(0);
        let remaining = previous.saturating_sub(1);

        if remaining == 0 {
            self.inner.idle.notify_waiters();
        }
        remaining
    }

    pub fn count(&self) -> usize {
        self.inner.count.load(Ordering::SeqCst)
    }

    /// Resolves once the counter is zero
    pub async fn wait_idle(&self) {
        loop {
            // Register interest before checking, otherwise a notify_waiters()
            // landing between the check and the await would be missed
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }
}
