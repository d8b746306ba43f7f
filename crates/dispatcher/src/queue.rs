//! DeliveryQueue - durable FIFO of records awaiting delivery
//!
//! One JSON file per item, named by its position. An item is written to
//! `<position>.tmp`, synced, then renamed to `<position>.json`, so a crash
//! never leaves a half-written item behind. The directory is synced after
//! every rename and delete so the change itself survives power loss.
//! Dequeued items stay on disk until they are acknowledged; whatever is on
//! disk at `open` is pending.

use std::collections::{HashMap, VecDeque};
use std::fs::{self, File};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use contracts::{FixRecord, QueueConfig};
use tokio::sync::Notify;
use tracing::{debug, info, instrument, warn};

use crate::error::QueueError;
use crate::metrics::DeliveryMetrics;

const ITEM_EXT: &str = "json";
const TEMP_EXT: &str = "tmp";
const CORRUPT_EXT: &str = "corrupt";

/// One item handed to a consumer
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub position: u64,
    pub record: FixRecord,
    /// Previous failed attempts in this process
    pub attempts: u32,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    position: u64,
    record: FixRecord,
    attempts: u32,
}

#[derive(Debug, Default)]
struct QueueState {
    /// Ascending by position
    pending: VecDeque<Entry>,
    in_flight: HashMap<u64, Entry>,
    next_position: u64,
}

impl QueueState {
    fn depth(&self) -> usize {
        self.pending.len() + self.in_flight.len()
    }

    fn insert_pending(&mut self, entry: Entry) {
        let idx = self.pending.partition_point(|e| e.position < entry.position);
        self.pending.insert(idx, entry);
    }
}

/// Durable multi-consumer queue
///
/// Shared as `Arc<DeliveryQueue>` between the ingestion task (single
/// producer) and the worker pool.
#[derive(Debug)]
pub struct DeliveryQueue {
    dir: PathBuf,
    max_items: Option<usize>,
    state: Mutex<QueueState>,
    /// Wakes consumers waiting for an item
    available: Notify,
    /// Wakes `wait_drained` callers
    drained: Notify,
    metrics: Arc<DeliveryMetrics>,
}

impl DeliveryQueue {
    /// Open (or create) a queue directory and load what it holds
    ///
    /// Stale temporary files are deleted. Files that do not decode are renamed
    /// to `<position>.corrupt` and skipped.
    #[instrument(name = "delivery_queue_open", skip_all, fields(dir = %dir.as_ref().display()))]
    pub fn open(dir: impl AsRef<Path>, max_items: Option<usize>) -> Result<Self, QueueError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| QueueError::storage(&dir, e))?;

        let mut loaded = Vec::new();
        let entries = fs::read_dir(&dir).map_err(|e| QueueError::storage(&dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| QueueError::storage(&dir, e))?.path();
            let Some(position) = position_of(&path) else {
                continue;
            };
            match path.extension().and_then(|e| e.to_str()) {
                Some(TEMP_EXT) => {
                    debug!(position, "removing stale temporary item");
                    remove_file(&path)?;
                }
                Some(ITEM_EXT) => match read_item(&path) {
                    Ok(record) => loaded.push(Entry {
                        position,
                        record,
                        attempts: 0,
                    }),
                    Err(reason) => {
                        warn!(position, %reason, "corrupt queue item set aside");
                        let aside = path.with_extension(CORRUPT_EXT);
                        fs::rename(&path, &aside).map_err(|e| QueueError::storage(&path, e))?;
                    }
                },
                _ => {}
            }
        }
        loaded.sort_by_key(|e| e.position);

        let next_position = loaded.last().map(|e| e.position + 1).unwrap_or(0);
        let metrics = Arc::new(DeliveryMetrics::new());
        metrics.add_recovered(loaded.len() as u64);

        let queue = Self {
            dir,
            max_items,
            state: Mutex::new(QueueState {
                pending: loaded.into(),
                in_flight: HashMap::new(),
                next_position,
            }),
            available: Notify::new(),
            drained: Notify::new(),
            metrics,
        };

        {
            let mut state = queue.lock();
            queue.enforce_capacity(&mut state);
            queue.metrics.set_depth(state.depth());
            info!(
                pending = state.pending.len(),
                next_position = state.next_position,
                "delivery queue opened"
            );
        }
        Ok(queue)
    }

    /// Open the queue described by a configuration section
    pub fn from_config(config: &QueueConfig) -> Result<Self, QueueError> {
        Self::open(&config.path, config.max_items)
    }

    /// Persist a record and make it visible to consumers
    ///
    /// Returns the item's position. Never waits on consumers.
    #[instrument(name = "delivery_queue_enqueue", level = "debug", skip_all, fields(t = record.timestamp))]
    pub fn enqueue(&self, record: &FixRecord) -> Result<u64, QueueError> {
        let position = {
            let mut state = self.lock();
            let position = state.next_position;
            state.next_position += 1;
            position
        };

        self.write_item(position, record)?;

        {
            let mut state = self.lock();
            state.insert_pending(Entry {
                position,
                record: *record,
                attempts: 0,
            });
            self.enforce_capacity(&mut state);
            self.metrics.set_depth(state.depth());
        }
        self.metrics.inc_enqueued();
        self.available.notify_one();

        debug!(position, "record enqueued");
        Ok(position)
    }

    /// Take the oldest pending item, waiting until one exists
    ///
    /// Cancel safe: dropping the future never loses an item.
    pub async fn dequeue(&self) -> Delivery {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(delivery) = self.try_dequeue() {
                return delivery;
            }
            notified.await;
        }
    }

    /// Take the oldest pending item if there is one
    pub fn try_dequeue(&self) -> Option<Delivery> {
        let mut state = self.lock();
        let entry = state.pending.pop_front()?;
        state.in_flight.insert(entry.position, entry);
        let more = !state.pending.is_empty();
        drop(state);

        // Pass the wakeup on so an idle consumer picks up the next item
        if more {
            self.available.notify_one();
        }
        Some(Delivery {
            position: entry.position,
            record: entry.record,
            attempts: entry.attempts,
        })
    }

    /// Delivered: delete the item for good
    #[instrument(name = "delivery_queue_ack", level = "debug", skip(self))]
    pub fn ack(&self, position: u64) -> Result<(), QueueError> {
        let drained = {
            let mut state = self.lock();
            state
                .in_flight
                .remove(&position)
                .ok_or(QueueError::NotInFlight(position))?;
            self.metrics.set_depth(state.depth());
            state.depth() == 0
        };

        self.metrics.inc_delivered();
        remove_file(&self.item_path(position))?;
        sync_dir(&self.dir).map_err(|e| QueueError::storage(&self.dir, e))?;
        if drained {
            self.drained.notify_waiters();
        }
        Ok(())
    }

    /// Not delivered: put the item back ahead of newer items
    #[instrument(name = "delivery_queue_release", level = "debug", skip(self))]
    pub fn release(&self, position: u64) -> Result<(), QueueError> {
        {
            let mut state = self.lock();
            let mut entry = state
                .in_flight
                .remove(&position)
                .ok_or(QueueError::NotInFlight(position))?;
            entry.attempts = entry.attempts.saturating_add(1);
            state.insert_pending(entry);
        }
        self.available.notify_one();
        Ok(())
    }

    /// Wait until nothing is pending or in flight
    pub async fn wait_drained(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.lock().depth() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Pending items
    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Items handed out but not yet acknowledged or released
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight.len()
    }

    /// No pending items
    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_items(&self) -> Option<usize> {
        self.max_items
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<DeliveryMetrics> {
        Arc::clone(&self.metrics)
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // Bookkeeping stays consistent even if a holder panicked
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn item_path(&self, position: u64) -> PathBuf {
        self.dir.join(format!("{position}.{ITEM_EXT}"))
    }

    fn write_item(&self, position: u64, record: &FixRecord) -> Result<(), QueueError> {
        let bytes =
            serde_json::to_vec(record).map_err(|source| QueueError::Encode { position, source })?;
        let temp = self.dir.join(format!("{position}.{TEMP_EXT}"));
        let path = self.item_path(position);

        let mut file = File::create(&temp).map_err(|e| QueueError::storage(&temp, e))?;
        file.write_all(&bytes)
            .and_then(|()| file.sync_all())
            .map_err(|e| QueueError::storage(&temp, e))?;
        drop(file);
        fs::rename(&temp, &path).map_err(|e| QueueError::storage(&path, e))?;
        sync_dir(&self.dir).map_err(|e| QueueError::storage(&self.dir, e))
    }

    /// Drop the oldest pending items while over capacity
    fn enforce_capacity(&self, state: &mut QueueState) {
        let Some(max) = self.max_items else {
            return;
        };
        while state.depth() > max {
            let Some(oldest) = state.pending.pop_front() else {
                break;
            };
            warn!(
                position = oldest.position,
                t = oldest.record.timestamp,
                max_items = max,
                "queue full, oldest record dropped"
            );
            if let Err(e) = remove_file(&self.item_path(oldest.position)) {
                warn!(position = oldest.position, error = %e, "failed to delete dropped item");
            } else if let Err(e) = sync_dir(&self.dir) {
                warn!(error = %e, "failed to sync queue directory");
            }
            self.metrics.inc_dropped();
        }
    }
}

fn position_of(path: &Path) -> Option<u64> {
    path.file_stem()?.to_str()?.parse().ok()
}

fn read_item(path: &Path) -> Result<FixRecord, String> {
    let bytes = fs::read(path).map_err(|e| e.to_string())?;
    serde_json::from_slice(&bytes).map_err(|e| e.to_string())
}

/// Persist renames and deletes inside `dir`
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

/// No portable directory sync off unix
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

fn remove_file(path: &Path) -> Result<(), QueueError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(QueueError::storage(path, e)),
    }
}
