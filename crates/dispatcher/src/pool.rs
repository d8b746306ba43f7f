//! WorkerPool - fixed set of consumer tasks draining the delivery queue

use std::sync::Arc;
use std::time::Duration;

use contracts::{Publisher, QueueConfig};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, error, info, instrument, warn};

use crate::queue::{DeliveryQueue, Delivery};

/// Worker pool settings
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker tasks
    pub workers: usize,
    /// First retry delay after a failed send
    pub retry_backoff: Duration,
    /// Retry delay ceiling
    pub max_retry_backoff: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from(&QueueConfig::default())
    }
}

impl From<&QueueConfig> for PoolConfig {
    fn from(config: &QueueConfig) -> Self {
        Self {
            workers: config.workers,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            max_retry_backoff: Duration::from_millis(config.max_retry_backoff_ms),
        }
    }
}

/// How a shutdown went
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Workers that stopped within the grace period
    pub stopped: usize,
    /// Workers aborted mid-send
    pub aborted: usize,
}

/// Handle to the running workers
pub struct WorkerPool {
    stop: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `config.workers` tasks sharing one queue and one publisher
    #[instrument(name = "worker_pool_spawn", skip_all, fields(workers = config.workers))]
    pub fn spawn<P>(queue: Arc<DeliveryQueue>, publisher: Arc<P>, config: PoolConfig) -> Self
    where
        P: Publisher + Sync + 'static,
    {
        let (stop, stop_rx) = watch::channel(false);
        let workers = (0..config.workers.max(1))
            .map(|id| {
                let worker = Worker {
                    id,
                    queue: Arc::clone(&queue),
                    publisher: Arc::clone(&publisher),
                    config: config.clone(),
                    stop: stop_rx.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect::<Vec<_>>();

        info!(workers = workers.len(), publisher = publisher.name(), "worker pool started");
        Self { stop, workers }
    }

    /// Number of workers
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Stop taking new items, wait at most `grace` for in-flight sends, then abort
    ///
    /// Items that were in flight when a worker was aborted stay on disk and are
    /// delivered after the next start.
    #[instrument(name = "worker_pool_shutdown", skip(self))]
    pub async fn shutdown(self, grace: Duration) -> ShutdownReport {
        // Err only means every worker already exited
        let _ = self.stop.send(true);

        let deadline = Instant::now() + grace;
        let mut report = ShutdownReport::default();
        for mut handle in self.workers {
            match timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => report.stopped += 1,
                Ok(Err(e)) => {
                    error!(error = ?e, "Worker task panicked");
                    report.stopped += 1;
                }
                Err(_) => {
                    handle.abort();
                    report.aborted += 1;
                }
            }
        }

        if report.aborted > 0 {
            warn!(aborted = report.aborted, "grace period expired, workers aborted");
        }
        debug!(stopped = report.stopped, "WorkerPool shutdown complete");
        report
    }
}

struct Worker<P> {
    id: usize,
    queue: Arc<DeliveryQueue>,
    publisher: Arc<P>,
    config: PoolConfig,
    stop: watch::Receiver<bool>,
}

impl<P: Publisher + Sync + 'static> Worker<P> {
    #[instrument(name = "worker_loop", skip(self), fields(worker = self.id))]
    async fn run(mut self) {
        debug!("Worker started");
        let mut backoff = self.config.retry_backoff;

        loop {
            let delivery = tokio::select! {
                biased;
                _ = self.stop.changed() => break,
                delivery = self.queue.dequeue() => delivery,
            };

            if self.deliver(&delivery).await {
                backoff = self.config.retry_backoff;
                continue;
            }

            tokio::select! {
                biased;
                _ = self.stop.changed() => break,
                _ = sleep(backoff) => {}
            }
            backoff = (backoff * 2).min(self.config.max_retry_backoff);
        }

        debug!("Worker stopped");
    }

    /// One send attempt; the item is acknowledged or released before returning
    async fn deliver(&self, delivery: &Delivery) -> bool {
        let position = delivery.position;
        let accepted = match self.publisher.send(&delivery.record).await {
            Ok(true) => true,
            Ok(false) => {
                warn!(position, attempts = delivery.attempts, "publisher rejected record");
                false
            }
            Err(e) => {
                warn!(position, attempts = delivery.attempts, error = %e, "send failed");
                false
            }
        };

        if accepted {
            if let Err(e) = self.queue.ack(position) {
                error!(position, error = %e, "ack failed");
            }
            return true;
        }

        self.queue.metrics().inc_failures();
        if let Err(e) = self.queue.release(position) {
            error!(position, error = %e, "release failed");
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ContractError, FixRecord};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Mock publisher for testing
    struct MockPublisher {
        name: String,
        delivered: Mutex<Vec<i64>>,
        attempts: AtomicU64,
        fail_first: u64,
        hang: bool,
    }

    impl MockPublisher {
        fn new(fail_first: u64) -> Self {
            Self {
                name: "mock".to_string(),
                delivered: Mutex::new(Vec::new()),
                attempts: AtomicU64::new(0),
                fail_first,
                hang: false,
            }
        }
    }

    impl Publisher for MockPublisher {
        fn name(&self) -> &str {
            &self.name
        }

        async fn send(&self, record: &FixRecord) -> Result<bool, ContractError> {
            if self.hang {
                std::future::pending::<()>().await;
            }
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_first {
                return Err(ContractError::publish_failed(&self.name, "mock failure"));
            }
            self.delivered.lock().unwrap().push(record.timestamp);
            Ok(true)
        }

        async fn close(&self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    fn record(t: i64) -> FixRecord {
        FixRecord {
            timestamp: t,
            lon: 0.0,
            lat: 0.0,
            speed_over_ground: 0.0,
            course: 0.0,
            altitude: 0.0,
        }
    }

    fn fast_config(workers: usize) -> PoolConfig {
        PoolConfig {
            workers,
            retry_backoff: Duration::from_millis(5),
            max_retry_backoff: Duration::from_millis(20),
        }
    }

    #[tokio::test]
    async fn test_pool_delivers_everything() {
        let dir = tempdir().unwrap();
        let queue = Arc::new(DeliveryQueue::open(dir.path(), None).unwrap());
        for t in 0..20 {
            queue.enqueue(&record(t)).unwrap();
        }

        let publisher = Arc::new(MockPublisher::new(0));
        let pool = WorkerPool::spawn(Arc::clone(&queue), Arc::clone(&publisher), fast_config(3));
        assert_eq!(pool.len(), 3);

        tokio::time::timeout(Duration::from_secs(5), queue.wait_drained())
            .await
            .unwrap();
        let report = pool.shutdown(Duration::from_secs(1)).await;
        assert_eq!(report, ShutdownReport { stopped: 3, aborted: 0 });

        let mut delivered = publisher.delivered.lock().unwrap().clone();
        delivered.sort_unstable();
        assert_eq!(delivered, (0..20).collect::<Vec<_>>());
        assert_eq!(queue.metrics().delivered(), 20);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_failures_are_retried() {
        let dir = tempdir().unwrap();
        let queue = Arc::new(DeliveryQueue::open(dir.path(), None).unwrap());
        queue.enqueue(&record(7)).unwrap();

        let publisher = Arc::new(MockPublisher::new(3));
        let pool = WorkerPool::spawn(Arc::clone(&queue), Arc::clone(&publisher), fast_config(1));

        tokio::time::timeout(Duration::from_secs(5), queue.wait_drained())
            .await
            .unwrap();
        pool.shutdown(Duration::from_secs(1)).await;

        assert_eq!(publisher.attempts.load(Ordering::SeqCst), 4);
        assert_eq!(queue.metrics().failures(), 3);
        assert_eq!(*publisher.delivered.lock().unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn test_hung_send_is_aborted_and_item_survives() {
        let dir = tempdir().unwrap();
        {
            let queue = Arc::new(DeliveryQueue::open(dir.path(), None).unwrap());
            queue.enqueue(&record(1)).unwrap();

            let mut publisher = MockPublisher::new(0);
            publisher.hang = true;
            let pool = WorkerPool::spawn(Arc::clone(&queue), Arc::new(publisher), fast_config(2));

            // let a worker pick the item up
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert_eq!(queue.in_flight(), 1);

            let report = pool.shutdown(Duration::from_millis(50)).await;
            assert_eq!(report.aborted, 1);
            assert_eq!(report.stopped, 1);
        }

        let queue = DeliveryQueue::open(dir.path(), None).unwrap();
        assert_eq!(queue.len(), 1);
    }
}
