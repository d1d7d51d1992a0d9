// src/crawl/frontier.rs
// =============================================================================
// The frontier: a bounded queue of pages waiting to be fetched.
//
// It is split in two halves:
// - FrontierProducer: owned by the aggregator (the only writer). Pushes never
//   wait; when the queue is full the item is handed back to the caller.
// - FrontierConsumer: cloned into every worker. Popping waits until an item
//   is available and returns None once the producer is gone and the queue
//   is drained.
//
// tokio's mpsc channel has a single receiver, so the workers share it behind
// a mutex. Only one worker waits inside recv() at a time; the rest queue up
// on the lock, which is exactly what we want for a work queue.
// =============================================================================

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, Semaphore};

/// One page queued for fetching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub url: String,
    pub depth: usize, // hops from the seed; the seed itself is depth 1
}

/// Why a push was refused
#[derive(Debug, PartialEq, Eq)]
pub enum PushError {
    /// The queue is at capacity
    Full(WorkItem),
    /// Every consumer is gone; nothing will ever fetch this item
    Closed(WorkItem),
}

pub struct FrontierProducer {
    tx: mpsc::Sender<WorkItem>,
}

#[derive(Clone)]
pub struct FrontierConsumer {
    rx: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
}

// Creates an empty frontier holding at most `capacity` items
//
// The capacity goes through channel_capacity(), so 0 means 1 slot.
pub fn frontier(capacity: usize) -> (FrontierProducer, FrontierConsumer) {
    let (tx, rx) = mpsc::channel(channel_capacity(capacity));
    (
        FrontierProducer { tx },
        FrontierConsumer {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Fits a requested bound into what a tokio channel accepts
///
/// tokio panics on a buffer of 0 or above `Semaphore::MAX_PERMITS`. Slots
/// are allocated as they fill, so a huge bound costs nothing up front.
pub fn channel_capacity(requested: usize) -> usize {
    requested.clamp(1, Semaphore::MAX_PERMITS)
}

impl FrontierProducer {
    /// Non-blocking enqueue
    pub fn try_push(&self, item: WorkItem) -> Result<(), PushError> {
        self.tx.try_send(item).map_err(|e| match e {
            mpsc::error::TrySendError::Full(item) => PushError::Full(item),
            mpsc::error::TrySendError::Closed(item) => PushError::Closed(item),
        })
    }
}

impl FrontierConsumer {
    /// Waits for the next item; None once the frontier is closed and empty
    pub async fn pop(&self) -> Option<WorkItem> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why Arc<Mutex<...>>?
//    - Arc lets many workers own the same receiver
//    - Mutex makes sure only one of them calls recv() at a time
//    - tokio's Mutex (not std's) is used because the guard is held across
//      an .await
//
// 2. What does try_send do?
//    - It returns immediately instead of waiting for room in the channel
//    - On failure the item comes back inside the error, so nothing is lost
//      unless the caller decides to drop it
//
// 3. How does the queue close?
//    - A channel closes when every Sender is dropped
//    - recv() then returns the remaining items, followed by None
// -----------------------------------------------------------------------------
