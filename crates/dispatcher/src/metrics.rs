//! Delivery metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters shared by the queue and its workers
#[derive(Debug, Default)]
pub struct DeliveryMetrics {
    /// Pending + in flight
    depth: AtomicUsize,
    /// Items persisted by enqueue
    enqueued: AtomicU64,
    /// Items reloaded from disk on open
    recovered: AtomicU64,
    /// Items acknowledged by the publisher
    delivered: AtomicU64,
    /// Failed or rejected sends
    failures: AtomicU64,
    /// Items dropped by the capacity policy
    dropped: AtomicU64,
}

impl DeliveryMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    pub fn set_depth(&self, depth: usize) {
        self.depth.store(depth, Ordering::Relaxed);
        metrics::gauge!("gnss_relay_queue_depth").set(depth as f64);
    }

    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    pub fn inc_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("gnss_relay_queue_enqueued_total").increment(1);
    }

    pub fn recovered(&self) -> u64 {
        self.recovered.load(Ordering::Relaxed)
    }

    pub fn add_recovered(&self, count: u64) {
        self.recovered.fetch_add(count, Ordering::Relaxed);
        metrics::counter!("gnss_relay_queue_recovered_total").increment(count);
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn inc_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("gnss_relay_delivered_total").increment(1);
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn inc_failures(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("gnss_relay_delivery_failures_total").increment(1);
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn inc_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("gnss_relay_queue_dropped_total").increment(1);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            depth: self.depth(),
            enqueued: self.enqueued(),
            recovered: self.recovered(),
            delivered: self.delivered(),
            failures: self.failures(),
            dropped: self.dropped(),
        }
    }
}

/// Snapshot of delivery metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub depth: usize,
    pub enqueued: u64,
    pub recovered: u64,
    pub delivered: u64,
    pub failures: u64,
    pub dropped: u64,
}
