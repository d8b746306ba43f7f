//! Ingestion Pipeline main entry

use std::sync::Arc;

use contracts::Sentence;
use tracing::{debug, instrument};

use crate::aggregator::{AggregatorState, CompletedEpoch, FixAggregator};
use crate::nmea;
use crate::stats::IngestionMetrics;

/// Shortest line that can hold a sentence (`$GPGGA` plus one more character)
pub const MIN_SENTENCE_LEN: usize = 7;

/// Ingestion Pipeline
///
/// Line → sentence → aggregator. Runs inside the single ingestion task, so
/// every method takes `&mut self` and nothing is locked.
#[derive(Debug)]
pub struct IngestionPipeline {
    aggregator: FixAggregator,

    /// Shared metrics
    metrics: Arc<IngestionMetrics>,
}

impl Default for IngestionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestionPipeline {
    /// Create new Ingestion Pipeline
    pub fn new() -> Self {
        Self {
            aggregator: FixAggregator::new(),
            metrics: Arc::new(IngestionMetrics::new()),
        }
    }

    /// Feed one raw line
    ///
    /// A line too short to be a sentence resets the aggregator. Lines that
    /// fail to decode are counted and skipped.
    #[instrument(name = "ingestion_line", level = "trace", skip(self, line), fields(len = line.len()))]
    pub fn ingest_line(&mut self, line: &str) -> Option<CompletedEpoch> {
        self.metrics.record_line();
        metrics::counter!("gnss_relay_lines_total").increment(1);

        let line = line.trim();
        if line.len() < MIN_SENTENCE_LEN {
            self.reset();
            return None;
        }

        let sentence = match nmea::decode(line) {
            Ok(sentence) => sentence,
            Err(e) => {
                self.metrics.record_decode_error();
                metrics::counter!("gnss_relay_decode_errors_total").increment(1);
                debug!(error = %e, line, "sentence skipped");
                return None;
            }
        };
        self.metrics.record_decoded();

        self.ingest_sentence(sentence)
    }

    /// Feed one already-decoded sentence
    pub fn ingest_sentence(&mut self, sentence: Sentence) -> Option<CompletedEpoch> {
        let epoch = self.aggregator.ingest(sentence)?;
        self.metrics.record_epoch();
        metrics::counter!("gnss_relay_epochs_total").increment(1);
        Some(epoch)
    }

    /// Discard the epoch in progress
    pub fn reset(&mut self) {
        if self.aggregator.state() != AggregatorState::CollectingSatellites
            || !self.aggregator.blob().satellites.is_empty()
        {
            debug!(state = ?self.aggregator.state(), "aggregator reset");
        }
        self.aggregator.reset();
        self.metrics.record_reset();
        metrics::counter!("gnss_relay_resets_total").increment(1);
    }

    /// Current aggregator state
    pub fn state(&self) -> AggregatorState {
        self.aggregator.state()
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }
}
