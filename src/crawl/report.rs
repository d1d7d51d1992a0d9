// src/crawl/report.rs
// =============================================================================
// The crawl log.
//
// Every crawled page produces one multi-line record:
//
//   https://foo.com (depth 1)
//       https://a.com
//       https://b.com
//
// All records go through a channel to a single writer running on a blocking
// thread. That writer is the only thing touching the output, so records can
// never interleave and no lock around stdout is needed.
// =============================================================================

use std::io::{self, Write};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

// How many records may wait for the writer before senders slow down
const REPORT_BUFFER: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub url: String,
    pub depth: usize,
    pub children: Vec<String>,
}

impl PageRecord {
    fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{} (depth {})", self.url, self.depth)?;
        for child in &self.children {
            writeln!(out, "    {}", child)?;
        }
        Ok(())
    }
}

/// Sending side of the report writer
#[derive(Clone)]
pub struct Reporter {
    tx: mpsc::Sender<PageRecord>,
}

impl Reporter {
    // Starts the writer
    //
    // The returned handle finishes once every Reporter clone is dropped and
    // all pending records are written.
    pub fn spawn<W>(mut out: W) -> (Self, JoinHandle<io::Result<()>>)
    where
        W: Write + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<PageRecord>(REPORT_BUFFER);

        let handle = tokio::task::spawn_blocking(move || {
            while let Some(record) = rx.blocking_recv() {
                record.write_to(&mut out)?;
            }
            out.flush()
        });

        (Self { tx }, handle)
    }

    // Queues a record for the writer
    //
    // Fails once the writer has stopped (an I/O error such as a closed
    // pipe). The error itself comes out of the writer's join handle.
    pub async fn page(&self, record: PageRecord) -> Result<(), WriterStopped> {
        self.tx.send(record).await.map_err(|_| WriterStopped)
    }
}

/// The report writer is no longer accepting records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterStopped;
