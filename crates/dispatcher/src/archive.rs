//! RawArchive - append-only log of every completed epoch
//!
//! Epoch blobs are handed to a writer task over a bounded channel. The
//! ingestion path never waits on the disk: when the channel is full the blob
//! is dropped and counted.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_channel::{Receiver, Sender, TrySendError};
use contracts::AggregateBlob;
use serde::Serialize;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use crate::error::DispatcherError;

/// Default channel capacity between ingestion and the writer task
pub const DEFAULT_ARCHIVE_CAPACITY: usize = 256;

#[derive(Debug, Serialize)]
struct ArchiveLine {
    t: Option<i64>,
    blob: AggregateBlob,
}

#[derive(Debug, Default)]
struct ArchiveCounters {
    written: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

/// Counts reported by [`RawArchive::close`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub written: u64,
    pub dropped: u64,
    pub failed: u64,
}

/// Handle to the archive writer
pub struct RawArchive {
    path: PathBuf,
    tx: Sender<ArchiveLine>,
    counters: Arc<ArchiveCounters>,
    writer: JoinHandle<()>,
}

impl RawArchive {
    /// Open (append) the archive file and start the writer task
    #[instrument(name = "raw_archive_open", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>, capacity: usize) -> Result<Self, DispatcherError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        let (tx, rx) = async_channel::bounded(capacity.max(1));
        let counters = Arc::new(ArchiveCounters::default());
        let writer = tokio::spawn(archive_writer(
            BufWriter::new(file),
            rx,
            Arc::clone(&counters),
        ));

        debug!("raw archive opened");
        Ok(Self {
            path,
            tx,
            counters,
            writer,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Queue one epoch for archival (non-blocking)
    ///
    /// Returns false if the blob was dropped.
    pub fn record(&self, timestamp: Option<i64>, blob: &AggregateBlob) -> bool {
        let line = ArchiveLine {
            t: timestamp,
            blob: blob.clone(),
        };
        match self.tx.try_send(line) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("gnss_relay_archive_dropped_total").increment(1);
                warn!(t = timestamp, "archive busy, epoch dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                error!("archive writer closed unexpectedly");
                false
            }
        }
    }

    /// Flush what is queued and stop the writer
    #[instrument(name = "raw_archive_close", skip(self))]
    pub async fn close(self) -> ArchiveSummary {
        self.tx.close();
        if let Err(e) = self.writer.await {
            error!(error = ?e, "archive writer panicked");
        }
        ArchiveSummary {
            written: self.counters.written.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

/// Writer task: one JSON line per epoch
async fn archive_writer(
    mut out: BufWriter<fs::File>,
    rx: Receiver<ArchiveLine>,
    counters: Arc<ArchiveCounters>,
) {
    while let Ok(line) = rx.recv().await {
        let result = match serde_json::to_vec(&line) {
            Ok(mut bytes) => {
                bytes.push(b'\n');
                out.write_all(&bytes).await.map_err(|e| e.to_string())
            }
            Err(e) => Err(e.to_string()),
        };
        match result {
            Ok(()) => {
                counters.written.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                error!(t = line.t, error = %e, "archive write failed");
            }
        }
        // Flush whenever the channel runs dry
        if rx.is_empty() {
            if let Err(e) = out.flush().await {
                error!(error = %e, "archive flush failed");
            }
        }
    }

    if let Err(e) = out.flush().await {
        error!(error = %e, "archive flush failed on shutdown");
    }
    debug!("archive writer stopped");
}
