//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{PublisherKind, TrackerConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    input: String,
    queue: String,
    workers: usize,
    publisher: String,
    publisher_kind: String,
    archive: bool,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: config.version.as_str().to_string(),
                    input: config.input.path.display().to_string(),
                    queue: config.queue.path.display().to_string(),
                    workers: config.queue.workers,
                    publisher: config.publisher.name.clone(),
                    publisher_kind: format!("{:?}", config.publisher.kind),
                    archive: config.archive.is_some(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &TrackerConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.publisher.kind == PublisherKind::Log {
        warnings.push("Log publisher configured - records are only written to the log".to_string());
    }

    if config.queue.max_items.is_none() {
        warnings.push("queue.max_items is unset - the queue may grow without bound".to_string());
    }

    if config.queue.path.is_relative() {
        warnings.push(format!(
            "queue.path '{}' is relative to the working directory",
            config.queue.path.display()
        ));
    }

    if config.queue.workers > 1 {
        warnings.push(format!(
            "{} delivery workers - records may reach the collector out of order",
            config.queue.workers
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Input: {}", summary.input);
            println!("  Queue: {} ({} workers)", summary.queue, summary.workers);
            println!(
                "  Publisher: {} ({})",
                summary.publisher, summary.publisher_kind
            );
            println!("  Archive: {}", if summary.archive { "on" } else { "off" });
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
