//! QueueWriter - persists emitted records off the ingestion task
//!
//! Same shape as the raw archive: a bounded channel feeding one writer
//! task. The writer runs each `DeliveryQueue::enqueue` on the blocking pool,
//! so the file write, fsync and rename never stall ingestion. Records reach
//! the queue in submission order and become visible to consumers only once
//! they are on disk.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_channel::{Receiver, Sender, TrySendError};
use contracts::FixRecord;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use crate::queue::DeliveryQueue;

/// Default channel capacity between ingestion and the queue writer
pub const DEFAULT_WRITER_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
struct WriterCounters {
    written: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

/// Counts reported by [`QueueWriter::close`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterSummary {
    /// Durably enqueued
    pub written: u64,
    /// Rejected because the channel was full
    pub dropped: u64,
    /// Enqueue returned an error
    pub failed: u64,
}

impl WriterSummary {
    /// Records that never reached the queue
    pub fn lost(&self) -> u64 {
        self.dropped + self.failed
    }
}

/// Handle to the queue writer task
pub struct QueueWriter {
    tx: Sender<FixRecord>,
    counters: Arc<WriterCounters>,
    writer: JoinHandle<()>,
}

impl QueueWriter {
    /// Start the writer task for `queue`
    pub fn spawn(queue: Arc<DeliveryQueue>, capacity: usize) -> Self {
        let (tx, rx) = async_channel::bounded(capacity.max(1));
        let counters = Arc::new(WriterCounters::default());
        let writer = tokio::spawn(queue_writer(queue, rx, Arc::clone(&counters)));
        Self {
            tx,
            counters,
            writer,
        }
    }

    /// Hand one record to the writer (non-blocking)
    ///
    /// Returns false if the record was dropped.
    pub fn submit(&self, record: &FixRecord) -> bool {
        match self.tx.try_send(*record) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("gnss_relay_enqueue_failures_total", "reason" => "busy")
                    .increment(1);
                warn!(t = record.timestamp, "queue writer busy, record dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                error!(t = record.timestamp, "queue writer closed unexpectedly");
                false
            }
        }
    }

    /// Records submitted but not yet persisted
    pub fn backlog(&self) -> usize {
        self.tx.len()
    }

    /// Persist what is queued and stop the writer
    #[instrument(name = "queue_writer_close", skip(self))]
    pub async fn close(self) -> WriterSummary {
        self.tx.close();
        if let Err(e) = self.writer.await {
            error!(error = ?e, "queue writer panicked");
        }
        WriterSummary {
            written: self.counters.written.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

async fn queue_writer(
    queue: Arc<DeliveryQueue>,
    rx: Receiver<FixRecord>,
    counters: Arc<WriterCounters>,
) {
    while let Ok(record) = rx.recv().await {
        let target = Arc::clone(&queue);
        let result = tokio::task::spawn_blocking(move || target.enqueue(&record)).await;
        match result {
            Ok(Ok(_)) => {
                counters.written.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(e)) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("gnss_relay_enqueue_failures_total", "reason" => "storage")
                    .increment(1);
                error!(t = record.timestamp, error = %e, "enqueue failed, record lost");
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                error!(t = record.timestamp, error = ?e, "enqueue task panicked");
            }
        }
    }
    debug!("queue writer stopped");
}
