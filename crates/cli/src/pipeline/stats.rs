//! Relay statistics and metrics.

use std::time::Duration;

use dispatcher::{ArchiveSummary, MetricsSnapshot, ShutdownReport};
use ingestion::MetricsSnapshot as IngestionSnapshot;
use observability::RelayStatsAggregator;

/// Statistics from a relay run
#[derive(Debug, Clone, Default)]
pub struct RelayStats {
    /// Line, decode and epoch counters from the ingestion path
    pub ingestion: IngestionSnapshot,

    /// Sampler decisions and run summaries
    pub relay: RelayStatsAggregator,

    /// Records the queue refused
    pub enqueue_failures: u64,

    /// Queue and delivery counters at shutdown
    pub delivery: MetricsSnapshot,

    /// Items still waiting (pending + in flight) at shutdown
    pub left_in_queue: usize,

    /// Worker pool shutdown outcome
    pub shutdown: ShutdownReport,

    /// Archive counters, when archiving was enabled
    pub archive: Option<ArchiveSummary>,

    /// Stopped by a signal or timeout rather than end of input
    pub interrupted: bool,

    /// Total duration of the run
    pub duration: Duration,
}

impl RelayStats {
    /// Complete epochs per second
    pub fn epochs_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.ingestion.epochs_completed as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Relay Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Lines read: {}", self.ingestion.lines_read);
        println!("   ├─ Decode errors: {}", self.ingestion.decode_errors);
        println!("   ├─ Aggregator resets: {}", self.ingestion.resets);
        println!("   ├─ Epochs: {}", self.ingestion.epochs_completed);
        println!("   ├─ Epochs/s: {:.2}", self.epochs_per_sec());
        println!("   └─ Interrupted: {}", self.interrupted);

        let summary = self.relay.summary();

        println!("\n📈 Sampler");
        println!(
            "   ├─ Emissions: {} (decimated {:.2}%)",
            summary.emissions, summary.decimation_rate
        );
        for (reason, count) in &summary.emissions_by_reason {
            println!("   │  ├─ {}: {}", reason, count);
        }
        println!("   ├─ Rejected updates: {}", summary.rejected_updates);
        println!("   ├─ Satellites per epoch: {}", summary.satellites);
        println!("   ├─ Speed (knots): {}", summary.speed_knots);
        println!("   └─ Emission gap (s): {}", summary.emission_gap_s);

        println!("\n📤 Delivery");
        println!("   ├─ Enqueued: {}", self.delivery.enqueued);
        println!("   ├─ Recovered from disk: {}", self.delivery.recovered);
        println!("   ├─ Delivered: {}", self.delivery.delivered);
        println!("   ├─ Failed attempts: {}", self.delivery.failures);
        println!("   ├─ Dropped (queue full): {}", self.delivery.dropped);
        println!("   ├─ Enqueue failures: {}", self.enqueue_failures);
        println!("   ├─ Left in queue: {}", self.left_in_queue);
        println!(
            "   └─ Workers: {} stopped, {} aborted",
            self.shutdown.stopped, self.shutdown.aborted
        );

        if let Some(archive) = &self.archive {
            println!("\n🗄️  Archive");
            println!("   ├─ Written: {}", archive.written);
            println!("   ├─ Dropped: {}", archive.dropped);
            println!("   └─ Failed: {}", archive.failed);
        }

        println!();
    }
}
