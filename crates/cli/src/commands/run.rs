//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use super::{apply_overrides, info::print_config_info, load_config};
use crate::cli::RunArgs;
use crate::pipeline::{shutdown_signal, InputMode, Relay, RelayConfig};

/// Execute the `run` command
pub async fn run_relay(args: &RunArgs) -> Result<()> {
    let mut tracker = load_config(args.config.as_deref())?;

    // Apply CLI overrides
    apply_overrides(&mut tracker, args.input.as_ref(), args.queue_dir.as_ref())?;

    info!(
        input = %tracker.input.path.display(),
        queue = %tracker.queue.path.display(),
        workers = tracker.queue.workers,
        publisher = %tracker.publisher.name,
        kind = ?tracker.publisher.kind,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_info(&tracker);
        return Ok(());
    }

    let relay = Relay::new(RelayConfig {
        tracker,
        mode: InputMode::Live,
        max_epochs: (args.max_epochs > 0).then_some(args.max_epochs),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    });

    info!("Starting relay...");
    let stats = relay
        .run(shutdown_signal())
        .await
        .context("Relay execution failed")?;

    info!(
        epochs = stats.ingestion.epochs_completed,
        emitted = stats.relay.emissions,
        delivered = stats.delivery.delivered,
        duration_secs = stats.duration.as_secs_f64(),
        "Relay stopped"
    );
    stats.print_summary();

    Ok(())
}
