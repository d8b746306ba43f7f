//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::TrackerConfig;
use tracing::info;

use super::load_config;
use crate::cli::InfoArgs;

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!("Loading configuration info");

    let config = load_config(args.config.as_deref())?;

    if args.json {
        let json = config_loader::ConfigLoader::to_json(&config)
            .context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config);
    }

    Ok(())
}

pub(crate) fn print_config_info(config: &TrackerConfig) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 GNSS Relay Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📡 Input");
    println!("   ├─ Version: {}", config.version.as_str());
    println!("   ├─ Source: {}", config.input.path.display());
    println!("   └─ Read timeout: {} ms", config.input.read_timeout_ms);

    let sampler = &config.sampler;
    println!("\n📐 Sampler");
    println!(
        "   ├─ Sampling distance: {} .. {} m",
        sampler.minimum_sampling_distance, sampler.maximum_sampling_distance
    );
    println!("   ├─ Volatility clamp: {}", sampler.volatility_clamp);
    println!(
        "   ├─ Pause / resume: {} / {} m",
        sampler.pause_distance, sampler.resume_distance
    );
    println!("   └─ Moving average: {} samples", sampler.moving_average_length);

    let queue = &config.queue;
    println!("\n🗃️  Queue");
    println!("   ├─ Directory: {}", queue.path.display());
    match queue.max_items {
        Some(max) => println!("   ├─ Capacity: {} items", max),
        None => println!("   ├─ Capacity: unbounded"),
    }
    println!("   ├─ Workers: {}", queue.workers);
    println!(
        "   ├─ Retry backoff: {} .. {} ms",
        queue.retry_backoff_ms, queue.max_retry_backoff_ms
    );
    println!("   └─ Shutdown grace: {} ms", queue.shutdown_grace_ms);

    let publisher = &config.publisher;
    println!("\n📤 Publisher");
    println!("   ├─ Name: {}", publisher.name);
    if publisher.params.is_empty() {
        println!("   └─ Kind: {:?}", publisher.kind);
    } else {
        println!("   ├─ Kind: {:?}", publisher.kind);
        let mut params: Vec<_> = publisher.params.iter().collect();
        params.sort();
        for (i, (key, value)) in params.iter().enumerate() {
            let prefix = if i == params.len() - 1 { "└─" } else { "├─" };
            println!("   {} {} = {}", prefix, key, value);
        }
    }

    if let Some(archive) = &config.archive {
        println!("\n🗄️  Archive");
        println!("   └─ Path: {}", archive.path.display());
    }

    println!();
}
