//! Ingestion counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Ingestion metrics
///
/// Lock-free counters shared between the ingestion task and whoever prints
/// the run summary.
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Lines read from the source
    pub lines_read: AtomicU64,

    /// Lines decoded into a sentence
    pub sentences_decoded: AtomicU64,

    /// Lines rejected by the decoder
    pub decode_errors: AtomicU64,

    /// Aggregator resets caused by short lines
    pub resets: AtomicU64,

    /// Completed epochs
    pub epochs_completed: AtomicU64,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_line(&self) {
        self.lines_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decoded(&self) {
        self.sentences_decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reset(&self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_epoch(&self) {
        self.epochs_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            lines_read: self.lines_read.load(Ordering::Relaxed),
            sentences_decoded: self.sentences_decoded.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
            epochs_completed: self.epochs_completed.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub lines_read: u64,
    pub sentences_decoded: u64,
    pub decode_errors: u64,
    pub resets: u64,
    pub epochs_completed: u64,
}
