//! Relay orchestrator - coordinates all components.
//!
//! One task runs the ingestion path (read → decode → aggregate → sample)
//! in strict arrival order and hands emissions to the queue writer, which
//! persists them off that task; the worker pool drains the queue
//! concurrently.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{Publisher, TrackerConfig};
use dispatcher::{
    create_publisher, DeliveryQueue, PoolConfig, QueueWriter, RawArchive, WorkerPool,
    DEFAULT_ARCHIVE_CAPACITY, DEFAULT_WRITER_CAPACITY,
};
use ingestion::{CompletedEpoch, IngestionPipeline, LineEvent, LineSource};
use sampler::{AdaptiveSampler, Emission, SamplerError};
use tracing::{debug, info, warn};

use super::RelayStats;
use crate::error::CliError;

/// Where lines come from and what happens when they end
#[derive(Debug, Clone)]
pub enum InputMode {
    /// Receiver device from configuration; runs until stopped
    Live,
    /// Recorded log; ends at EOF, then waits for the queue to drain
    Replay {
        file: PathBuf,
        drain_timeout: Duration,
    },
}

/// Relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Validated configuration file contents
    pub tracker: TrackerConfig,

    pub mode: InputMode,

    /// Stop after this many complete epochs (None = unlimited)
    pub max_epochs: Option<u64>,

    /// Stop ingesting after this long (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main relay orchestrator
pub struct Relay {
    config: RelayConfig,
}

impl Relay {
    /// Create a new relay with the given configuration
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    /// Run until the input ends, a limit is hit or `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<RelayStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let tracker = &self.config.tracker;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Open durable queue
        let queue = Arc::new(DeliveryQueue::from_config(&tracker.queue).with_context(|| {
            format!(
                "Failed to open delivery queue at {}",
                tracker.queue.path.display()
            )
        })?);
        info!(
            path = %tracker.queue.path.display(),
            recovered = queue.len(),
            "Delivery queue ready"
        );

        let publisher = Arc::new(
            create_publisher(&tracker.publisher)
                .await
                .map_err(|e| CliError::startup("publisher", e))?,
        );
        let sampler = AdaptiveSampler::new(tracker.sampler.clone())
            .map_err(|e| CliError::startup("sampler", e))?;

        let input_path = match &self.config.mode {
            InputMode::Live => tracker.input.path.clone(),
            InputMode::Replay { file, .. } => file.clone(),
        };
        let read_timeout = Duration::from_millis(tracker.input.read_timeout_ms);
        let mut source = LineSource::open(&input_path, read_timeout)
            .await
            .with_context(|| format!("Failed to open input {}", input_path.display()))?;

        let archive = match &tracker.archive {
            Some(archive) => Some(
                RawArchive::open(&archive.path, DEFAULT_ARCHIVE_CAPACITY)
                    .await
                    .with_context(|| {
                        format!("Failed to open archive {}", archive.path.display())
                    })?,
            ),
            None => None,
        };

        // Start delivery
        let writer = QueueWriter::spawn(Arc::clone(&queue), DEFAULT_WRITER_CAPACITY);
        let pool = WorkerPool::spawn(
            Arc::clone(&queue),
            Arc::clone(&publisher),
            PoolConfig::from(&tracker.queue),
        );
        info!(
            input = source.origin(),
            publisher = publisher.name(),
            workers = pool.len(),
            archive = archive.is_some(),
            "Relay running"
        );

        let mut session = Session {
            ingestion: IngestionPipeline::new(),
            sampler,
            writer: &writer,
            archive: archive.as_ref(),
            stats: RelayStats::default(),
        };

        let deadline = self
            .config
            .timeout
            .map(|t| tokio::time::Instant::now() + t);
        let expiry = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(shutdown);
        tokio::pin!(expiry);

        let read_result: Result<()> = loop {
            let event = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping ingestion");
                    session.stats.interrupted = true;
                    break Ok(());
                }
                _ = &mut expiry => {
                    warn!("Relay timeout reached, stopping ingestion");
                    session.stats.interrupted = true;
                    break Ok(());
                }
                event = source.next_event() => event,
            };

            match event {
                Ok(LineEvent::Line(line)) => {
                    session.handle_line(&line);
                    if let Some(max) = self.config.max_epochs {
                        if session.stats.relay.epochs >= max {
                            info!(epochs = max, "Reached max epochs limit");
                            break Ok(());
                        }
                    }
                }
                Ok(LineEvent::Idle) => observability::record_read_idle(),
                Ok(LineEvent::Closed) => {
                    info!(input = source.origin(), "Input closed");
                    break Ok(());
                }
                Err(e) => break Err(anyhow::Error::new(e).context("Failed to read input")),
            }
        };

        let Session {
            ingestion,
            mut stats,
            ..
        } = session;

        // Everything emitted is on disk before draining or stopping workers
        let written = writer.close().await;
        stats.enqueue_failures = written.lost();
        debug!(
            written = written.written,
            dropped = written.dropped,
            failed = written.failed,
            "Queue writer stopped"
        );

        if let InputMode::Replay { drain_timeout, .. } = &self.config.mode {
            if read_result.is_ok() && !stats.interrupted {
                info!(pending = queue.len(), "Input exhausted, draining queue");
                tokio::select! {
                    _ = queue.wait_drained() => info!("Queue drained"),
                    _ = tokio::time::sleep(*drain_timeout) => {
                        warn!(
                            left = queue.len() + queue.in_flight(),
                            "Drain timeout reached"
                        );
                    }
                    _ = &mut shutdown => {
                        warn!("Received shutdown signal while draining");
                        stats.interrupted = true;
                    }
                }
            }
        }

        // Shutdown
        info!("Shutting down relay...");
        stats.shutdown = pool
            .shutdown(Duration::from_millis(tracker.queue.shutdown_grace_ms))
            .await;
        if let Err(e) = publisher.close().await {
            warn!(error = %e, "Error while closing publisher");
        }
        if let Some(archive) = archive {
            stats.archive = Some(archive.close().await);
        }

        stats.ingestion = ingestion.metrics().snapshot();
        stats.delivery = queue.metrics().snapshot();
        stats.left_in_queue = queue.len() + queue.in_flight();
        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            epochs = stats.ingestion.epochs_completed,
            delivered = stats.delivery.delivered,
            left_in_queue = stats.left_in_queue,
            "Relay shutdown complete"
        );

        read_result?;
        Ok(stats)
    }
}

/// State owned by the ingestion task
struct Session<'a> {
    ingestion: IngestionPipeline,
    sampler: AdaptiveSampler,
    writer: &'a QueueWriter,
    archive: Option<&'a RawArchive>,
    stats: RelayStats,
}

impl Session<'_> {
    fn handle_line(&mut self, line: &str) {
        if let Some(epoch) = self.ingestion.ingest_line(line) {
            self.handle_epoch(epoch);
        }
    }

    fn handle_epoch(&mut self, epoch: CompletedEpoch) {
        let satellites = epoch.blob.satellites_reported();
        observability::record_epoch_completed(satellites);
        self.stats.relay.update_epoch(satellites);

        if let Some(archive) = self.archive {
            archive.record(epoch.fix.timestamp, &epoch.blob);
        }

        match self.sampler.process_update(&epoch.fix) {
            Ok(emissions) => {
                for emission in emissions {
                    self.forward(emission);
                }
            }
            Err(e) => {
                match &e {
                    SamplerError::NotValid(_) => debug!(error = %e, t = ?epoch.fix.timestamp, "update rejected"),
                    _ => warn!(error = %e, t = ?epoch.fix.timestamp, "update rejected"),
                }
                observability::record_sampler_rejection(e.kind());
                self.stats.relay.update_rejection(e.kind());
            }
        }
    }

    fn forward(&mut self, emission: Emission) {
        let reason = emission.reason.as_str();
        observability::record_emission(reason, &emission.record);
        self.stats.relay.update_emission(reason, &emission.record);

        if self.writer.submit(&emission.record) {
            debug!(reason, t = emission.record.timestamp, "record handed to queue writer");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ArchiveConfig, FixRecord, PublisherConfig, PublisherKind};
    use ingestion::{MockReceiver, MockReceiverConfig};
    use std::collections::HashMap;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_log(path: &Path, epochs: usize) {
        let mut receiver = MockReceiver::new(MockReceiverConfig::default());
        let mut text = receiver.lines(epochs).join("\n");
        text.push('\n');
        std::fs::write(path, text).unwrap();
    }

    fn tracker(root: &Path) -> TrackerConfig {
        let mut config = TrackerConfig::default();
        config.queue.path = root.join("queue");
        config.queue.retry_backoff_ms = 10;
        config.queue.max_retry_backoff_ms = 50;
        config.queue.shutdown_grace_ms = 500;
        config.publisher = PublisherConfig {
            name: "file".to_string(),
            kind: PublisherKind::File,
            params: HashMap::from([(
                "path".to_string(),
                root.join("out.jsonl").display().to_string(),
            )]),
        };
        config.archive = Some(ArchiveConfig {
            path: root.join("raw.jsonl"),
        });
        config
    }

    #[tokio::test]
    async fn replay_delivers_and_drains() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("drive.nmea");
        write_log(&log, 20);

        let relay = Relay::new(RelayConfig {
            tracker: tracker(dir.path()),
            mode: InputMode::Replay {
                file: log,
                drain_timeout: Duration::from_secs(5),
            },
            max_epochs: None,
            timeout: None,
            metrics_port: None,
        });
        let stats = relay.run(std::future::pending()).await.unwrap();

        assert_eq!(stats.ingestion.epochs_completed, 20);
        assert!(!stats.interrupted);
        // first fix pauses, the moving second one resumes
        assert_eq!(stats.relay.emissions, 2);
        assert_eq!(stats.delivery.delivered, 2);
        assert_eq!(stats.left_in_queue, 0);

        let out = std::fs::read_to_string(dir.path().join("out.jsonl")).unwrap();
        let records: Vec<FixRecord> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert!((records[0].lat - 51.5074).abs() < 1e-6);

        let archived = std::fs::read_to_string(dir.path().join("raw.jsonl")).unwrap();
        assert_eq!(archived.lines().count(), 20);
        assert_eq!(stats.archive.map(|a| a.written), Some(20));
    }

    #[tokio::test]
    async fn live_mode_stops_at_max_epochs() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("device.nmea");
        write_log(&log, 10);

        let mut config = tracker(dir.path());
        config.input.path = log;
        config.archive = None;

        let relay = Relay::new(RelayConfig {
            tracker: config,
            mode: InputMode::Live,
            max_epochs: Some(3),
            timeout: None,
            metrics_port: None,
        });
        let stats = relay.run(std::future::pending()).await.unwrap();

        assert_eq!(stats.ingestion.epochs_completed, 3);
        assert!(stats.archive.is_none());
    }

    #[tokio::test]
    async fn shutdown_signal_interrupts_before_reading() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("drive.nmea");
        write_log(&log, 5);

        let relay = Relay::new(RelayConfig {
            tracker: tracker(dir.path()),
            mode: InputMode::Replay {
                file: log,
                drain_timeout: Duration::from_secs(1),
            },
            max_epochs: None,
            timeout: None,
            metrics_port: None,
        });
        let stats = relay.run(async {}).await.unwrap();

        assert!(stats.interrupted);
        assert_eq!(stats.ingestion.lines_read, 0);
    }

    #[tokio::test]
    async fn missing_input_fails_to_start() {
        let dir = tempdir().unwrap();
        let relay = Relay::new(RelayConfig {
            tracker: tracker(dir.path()),
            mode: InputMode::Replay {
                file: dir.path().join("missing.nmea"),
                drain_timeout: Duration::from_secs(1),
            },
            max_epochs: None,
            timeout: None,
            metrics_port: None,
        });
        let err = relay.run(std::future::pending()).await.unwrap_err();
        assert!(err.to_string().contains("Failed to open input"));
    }
}
