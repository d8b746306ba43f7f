//! TrackerConfig - Config Loader output
//!
//! Every tunable has a default so an empty file (or no file) is a valid
//! configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use validator::Validate;

/// Config file schema version
///
/// Unknown versions fail to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    #[serde(alias = "v1", alias = "1")]
    V1,
}

impl ConfigVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigVersion::V1 => "V1",
        }
    }
}

/// Complete agent configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct TrackerConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Line source
    #[serde(default)]
    #[validate(nested)]
    pub input: InputConfig,

    /// Adaptive sampler tunables
    #[serde(default)]
    #[validate(nested)]
    pub sampler: SamplerConfig,

    /// Durable queue and worker pool
    #[serde(default)]
    #[validate(nested)]
    pub queue: QueueConfig,

    /// Collector endpoint
    #[serde(default)]
    pub publisher: PublisherConfig,

    /// Optional raw epoch archive
    #[serde(default)]
    pub archive: Option<ArchiveConfig>,
}

/// Line source configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct InputConfig {
    /// Serial device or file to read (`-` = stdin)
    pub path: PathBuf,

    /// Read timeout per line in milliseconds
    #[validate(range(min = 1))]
    pub read_timeout_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/dev/ttyUSB1"),
            read_timeout_ms: 100,
        }
    }
}

/// Adaptive sampler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SamplerConfig {
    /// Floor of emission spacing (meters)
    #[serde(alias = "sampling_distance")]
    #[validate(range(exclusive_min = 0.0))]
    pub minimum_sampling_distance: f64,

    /// Ceiling of emission spacing (meters)
    #[validate(range(exclusive_min = 0.0))]
    pub maximum_sampling_distance: f64,

    /// Upper bound of the course-volatility ratio
    #[validate(range(exclusive_min = 0.0))]
    pub volatility_clamp: f64,

    /// Mean step below which the vehicle counts as parked (meters)
    #[validate(range(min = 0.0))]
    pub pause_distance: f64,

    /// Mean step above which a parked vehicle counts as moving (meters)
    #[validate(range(min = 0.0))]
    pub resume_distance: f64,

    /// Sample window capacity
    #[validate(range(min = 1))]
    pub moving_average_length: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            minimum_sampling_distance: 50.0,
            maximum_sampling_distance: 30_000.0,
            volatility_clamp: 0.5,
            pause_distance: 0.5,
            resume_distance: 2.0,
            moving_average_length: 10,
        }
    }
}

/// Durable queue / worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct QueueConfig {
    /// Queue directory
    pub path: PathBuf,

    /// Number of delivery workers
    #[validate(range(min = 1, max = 64))]
    pub workers: usize,

    /// Maximum queued items (`None` = unbounded); oldest pending item dropped beyond it
    #[validate(range(min = 1))]
    pub max_items: Option<usize>,

    /// First retry delay after a failed publish
    #[validate(range(min = 1))]
    pub retry_backoff_ms: u64,

    /// Retry delay ceiling
    #[validate(range(min = 1))]
    pub max_retry_backoff_ms: u64,

    /// How long shutdown waits for in-flight publishes
    pub shutdown_grace_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./queue"),
            workers: 2,
            max_items: Some(100_000),
            retry_backoff_ms: 500,
            max_retry_backoff_ms: 30_000,
            shutdown_grace_ms: 2_000,
        }
    }
}

/// Publisher kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublisherKind {
    /// Log every record
    #[default]
    Log,
    /// Append JSON lines to a file
    File,
    /// One UDP datagram per record
    Udp,
    /// Newline-delimited JSON over TCP with per-record acknowledgement
    Tcp,
}

/// Publisher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Publisher name (used for logging/metrics)
    #[serde(default = "default_publisher_name")]
    pub name: String,

    /// Publisher type
    #[serde(default)]
    pub kind: PublisherKind,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            name: default_publisher_name(),
            kind: PublisherKind::default(),
            params: HashMap::new(),
        }
    }
}

fn default_publisher_name() -> String {
    "collector".to_string()
}

/// Raw epoch archive configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// JSON-lines file receiving one full blob per completed epoch
    pub path: PathBuf,
}
