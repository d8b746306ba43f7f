//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Generate `TrackerConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("gnss-relay.toml")).unwrap();
//! println!("Queue: {}", config.queue.path.display());
//! ```

mod parser;
mod rules;

pub use contracts::TrackerConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Format comes from the extension (.toml / .json); files without one
    /// (e.g. `/etc/gnss-relay/config`) are sniffed from their content.
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<TrackerConfig, ContractError> {
        let content = Self::read_file(path)?;
        let format = match Self::detect_format(path)? {
            Some(format) => format,
            None => ConfigFormat::sniff(&content),
        };
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<TrackerConfig, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Validate an already-built configuration (defaults or CLI overrides)
    pub fn validate(config: &TrackerConfig) -> Result<(), ContractError> {
        rules::validate(config)
    }

    /// Serialize TrackerConfig to TOML string
    pub fn to_toml(config: &TrackerConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize TrackerConfig to JSON string
    pub fn to_json(config: &TrackerConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<Option<ConfigFormat>, ContractError> {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Ok(None);
        };

        ConfigFormat::from_extension(ext).map(Some).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(content: &str, format: ConfigFormat) -> Result<TrackerConfig, ContractError> {
        let config = parser::parse(content, format)?;
        rules::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_TOML: &str = r#"
[input]
path = "/dev/ttyUSB1"
read_timeout_ms = 100

[sampler]
minimum_sampling_distance = 500.0
maximum_sampling_distance = 30000.0
pause_distance = 0.5
resume_distance = 2.0
moving_average_length = 10

[queue]
path = "./queue"
workers = 2

[publisher]
name = "aws"
kind = "tcp"
params = { addr = "127.0.0.1:8883" }

[archive]
path = "./raw.jsonl"
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(SAMPLE_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.publisher.name, "aws");
        assert!(config.archive.is_some());
    }

    #[test]
    fn test_round_trip_toml() {
        let config = ConfigLoader::load_from_str(SAMPLE_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&config).unwrap();
        let config2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(config.sampler, config2.sampler);
        assert_eq!(config.queue.workers, config2.queue.workers);
        assert_eq!(config.publisher.params, config2.publisher.params);
    }

    #[test]
    fn test_round_trip_json() {
        let config = ConfigLoader::load_from_str(SAMPLE_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&config).unwrap();
        let config2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(config.sampler, config2.sampler);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[sampler]
minimum_sampling_distance = 1000.0
maximum_sampling_distance = 10.0
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(matches!(
            result,
            Err(ContractError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_load_from_path_detects_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.json");
        std::fs::write(&path, r#"{ "queue": { "workers": 3 } }"#).unwrap();

        let config = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(config.queue.workers, 3);

        let bad = dir.path().join("relay.yaml");
        std::fs::write(&bad, "queue: {}").unwrap();
        assert!(ConfigLoader::load_from_path(&bad).is_err());
    }

    #[test]
    fn test_load_from_path_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        std::fs::write(&path, "[queue]\nworkers = 5\n").unwrap();

        let config = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(config.queue.workers, 5);
    }
}
