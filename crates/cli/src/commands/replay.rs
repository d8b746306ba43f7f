//! `replay` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use super::{apply_overrides, load_config};
use crate::cli::ReplayArgs;
use crate::pipeline::{shutdown_signal, InputMode, Relay, RelayConfig};

/// Execute the `replay` command
pub async fn run_replay(args: &ReplayArgs) -> Result<()> {
    if !args.file.exists() {
        anyhow::bail!("Replay file not found: {}", args.file.display());
    }

    let mut tracker = load_config(args.config.as_deref())?;
    apply_overrides(&mut tracker, None, args.queue_dir.as_ref())?;

    info!(
        file = %args.file.display(),
        queue = %tracker.queue.path.display(),
        publisher = %tracker.publisher.name,
        "Replaying recorded log"
    );

    let relay = Relay::new(RelayConfig {
        tracker,
        mode: InputMode::Replay {
            file: args.file.clone(),
            drain_timeout: Duration::from_secs(args.drain_timeout),
        },
        max_epochs: None,
        timeout: None,
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    });

    let stats = relay
        .run(shutdown_signal())
        .await
        .context("Replay failed")?;

    if stats.left_in_queue > 0 {
        warn!(
            left = stats.left_in_queue,
            "Records remain queued; they will be delivered on the next run"
        );
    }
    stats.print_summary();

    Ok(())
}
