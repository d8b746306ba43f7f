//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{ContractError, TrackerConfig};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// 无扩展名时按内容猜测：以 `{` 开头视为 JSON，其余按 TOML
    pub fn sniff(content: &str) -> Self {
        match content.trim_start().chars().next() {
            Some('{') => Self::Json,
            _ => Self::Toml,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<TrackerConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<TrackerConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<TrackerConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ConfigVersion, PublisherKind};

    #[test]
    fn test_parse_toml_sections() {
        let content = r#"
[input]
path = "/dev/ttyAMA0"

[sampler]
sampling_distance = 500
moving_average_length = 20

[queue]
path = "/var/lib/gnss-relay/queue"
workers = 4

[publisher]
kind = "udp"
params = { addr = "10.0.0.5:9000", format = "bincode" }
"#;
        let config = parse_toml(content).unwrap();
        assert_eq!(config.input.path.to_str(), Some("/dev/ttyAMA0"));
        assert_eq!(config.input.read_timeout_ms, 100);
        assert_eq!(config.sampler.minimum_sampling_distance, 500.0);
        assert_eq!(config.sampler.moving_average_length, 20);
        assert_eq!(config.queue.workers, 4);
        assert_eq!(config.queue.max_items, Some(100_000));
        assert_eq!(config.publisher.kind, PublisherKind::Udp);
        assert_eq!(config.publisher.params["format"], "bincode");
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{ "publisher": { "kind": "tcp", "params": { "addr": "127.0.0.1:7000" } } }"#;
        let config = parse_json(content).unwrap();
        assert_eq!(config.publisher.kind, PublisherKind::Tcp);
        assert_eq!(config.publisher.name, "collector");
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result = parse_toml("invalid toml [[[");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_config_version_gate() {
        assert_eq!(parse_toml("").unwrap().version, ConfigVersion::V1);
        assert_eq!(
            parse_toml("version = \"V1\"\n").unwrap().version,
            ConfigVersion::V1
        );
        assert_eq!(
            parse_json(r#"{ "version": "v1" }"#).unwrap().version,
            ConfigVersion::V1
        );

        let err = parse_toml("version = \"V2\"\n").unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
        assert!(err.to_string().contains("V2"), "{err}");
    }

    #[test]
    fn test_unknown_publisher_kind() {
        let result = parse_toml("[publisher]\nkind = \"mqtt\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_sniff_format() {
        assert_eq!(ConfigFormat::sniff("  \n{\"queue\": {}}"), ConfigFormat::Json);
        assert_eq!(ConfigFormat::sniff("[queue]\nworkers = 1"), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::sniff(""), ConfigFormat::Toml);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
