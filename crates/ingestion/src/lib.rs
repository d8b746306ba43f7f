//! # Ingestion Pipeline
//!
//! NMEA sentence ingestion module.
//!
//! Responsibilities:
//! - Read lines from a serial device / recorded log with a bounded timeout
//! - Decode NMEA-0183 sentences into typed [`contracts::Sentence`]s
//! - Aggregate one epoch's sentences into an `EpochFix` plus the raw blob
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{IngestionPipeline, LineEvent, LineSource};
//!
//! let mut source = LineSource::open(path, Duration::from_millis(100)).await?;
//! let mut pipeline = IngestionPipeline::new();
//!
//! loop {
//!     match source.next_event().await? {
//!         LineEvent::Line(line) => {
//!             if let Some(epoch) = pipeline.ingest_line(&line) {
//!                 // hand epoch.fix to the sampler
//!             }
//!         }
//!         LineEvent::Idle => continue,
//!         LineEvent::Closed => break,
//!     }
//! }
//! ```
//!
//! ## Mock Testing
//!
//! ```ignore
//! use ingestion::{MockReceiver, MockReceiverConfig};
//!
//! let source = MockReceiver::new(MockReceiverConfig::default())
//!     .into_source(100, Duration::from_millis(100));
//! ```

mod aggregator;
mod coord;
mod error;
mod mock;
mod nmea;
mod pipeline;
mod source;
mod stats;

// Re-exports
pub use aggregator::{AggregatorState, CompletedEpoch, FixAggregator};
pub use coord::{decimal_to_nmea, epoch_seconds, nmea_to_decimal};
pub use error::{CoordinateError, DecodeError, IngestionError, Result};
pub use mock::{MockReceiver, MockReceiverConfig};
pub use nmea::{checksum, decode, frame};
pub use pipeline::{IngestionPipeline, MIN_SENTENCE_LEN};
pub use source::{LineEvent, LineSource};
pub use stats::{IngestionMetrics, MetricsSnapshot};
