//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// GNSS Relay - NMEA telemetry agent with adaptive sampling and durable delivery
#[derive(Parser, Debug)]
#[command(
    name = "gnss-relay",
    author,
    version,
    about = "GNSS telemetry relay with adaptive sampling",
    long_about = "Reads NMEA sentences from a GNSS receiver, assembles complete position \n\
                  epochs, decimates them with a distance-based adaptive sampler and \n\
                  forwards the selected records through a crash-safe delivery queue."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "GNSS_RELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "GNSS_RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Relay a live receiver
    Run(RunArgs),

    /// Feed a recorded NMEA log through the relay, then drain the queue
    Replay(ReplayArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "GNSS_RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the receiver device or file (`-` for stdin)
    #[arg(short, long, env = "GNSS_RELAY_INPUT")]
    pub input: Option<PathBuf>,

    /// Override the delivery queue directory
    #[arg(long, env = "GNSS_RELAY_QUEUE_DIR")]
    pub queue_dir: Option<PathBuf>,

    /// Stop after this many complete epochs (0 = unlimited)
    #[arg(long, default_value = "0", env = "GNSS_RELAY_MAX_EPOCHS")]
    pub max_epochs: u64,

    /// Stop ingesting after this many seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "GNSS_RELAY_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "GNSS_RELAY_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `replay` command
#[derive(Parser, Debug, Clone)]
pub struct ReplayArgs {
    /// Recorded NMEA log
    pub file: PathBuf,

    /// Path to configuration file (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "GNSS_RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the delivery queue directory
    #[arg(long, env = "GNSS_RELAY_QUEUE_DIR")]
    pub queue_dir: Option<PathBuf>,

    /// Longest wait for the queue to drain after the log ends, in seconds
    #[arg(long, default_value = "30")]
    pub drain_timeout: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "GNSS_RELAY_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "gnss-relay.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; built-in defaults when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
