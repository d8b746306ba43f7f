//! 配置校验模块
//!
//! 校验规则：
//! - 字段取值范围 (`#[validate(...)]` 派生)
//! - minimum_sampling_distance < maximum_sampling_distance
//! - pause_distance <= resume_distance
//! - retry_backoff_ms <= max_retry_backoff_ms
//! - publisher 必填参数齐全

use contracts::{ContractError, PublisherConfig, PublisherKind, TrackerConfig};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// 校验 TrackerConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &TrackerConfig) -> Result<(), ContractError> {
    validate_ranges(config)?;
    validate_input(config)?;
    validate_sampler(config)?;
    validate_queue(config)?;
    validate_publisher(&config.publisher)?;
    validate_archive(config)?;
    Ok(())
}

/// 派生规则 (取值范围)
fn validate_ranges(config: &TrackerConfig) -> Result<(), ContractError> {
    let Err(errors) = config.validate() else {
        return Ok(());
    };

    let mut flat = Vec::new();
    flatten(String::new(), &errors, &mut flat);
    flat.sort();

    match flat.into_iter().next() {
        Some((field, message)) => Err(ContractError::config_validation(field, message)),
        None => Err(ContractError::config_validation("config", errors.to_string())),
    }
}

fn flatten(prefix: String, errors: &ValidationErrors, out: &mut Vec<(String, String)>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(errs) => {
                out.extend(errs.iter().map(|e| (path.clone(), e.to_string())));
            }
            ValidationErrorsKind::Struct(inner) => flatten(path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    flatten(format!("{path}[{idx}]"), inner, out);
                }
            }
        }
    }
}

fn validate_input(config: &TrackerConfig) -> Result<(), ContractError> {
    if config.input.path.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "input.path",
            "input path cannot be empty",
        ));
    }
    Ok(())
}

/// 校验采样器阈值
fn validate_sampler(config: &TrackerConfig) -> Result<(), ContractError> {
    let sampler = &config.sampler;

    if sampler.minimum_sampling_distance >= sampler.maximum_sampling_distance {
        return Err(ContractError::config_validation(
            "sampler.minimum_sampling_distance / sampler.maximum_sampling_distance",
            format!(
                "minimum_sampling_distance ({}) must be < maximum_sampling_distance ({})",
                sampler.minimum_sampling_distance, sampler.maximum_sampling_distance
            ),
        ));
    }

    // 暂停/恢复阈值之间需要留出滞回区间
    if sampler.pause_distance > sampler.resume_distance {
        return Err(ContractError::config_validation(
            "sampler.pause_distance / sampler.resume_distance",
            format!(
                "pause_distance ({}) must be <= resume_distance ({})",
                sampler.pause_distance, sampler.resume_distance
            ),
        ));
    }

    Ok(())
}

/// 校验队列配置
fn validate_queue(config: &TrackerConfig) -> Result<(), ContractError> {
    let queue = &config.queue;

    if queue.path.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "queue.path",
            "queue path cannot be empty",
        ));
    }

    if queue.retry_backoff_ms > queue.max_retry_backoff_ms {
        return Err(ContractError::config_validation(
            "queue.retry_backoff_ms / queue.max_retry_backoff_ms",
            format!(
                "retry_backoff_ms ({}) must be <= max_retry_backoff_ms ({})",
                queue.retry_backoff_ms, queue.max_retry_backoff_ms
            ),
        ));
    }

    Ok(())
}

/// 校验 publisher 配置
fn validate_publisher(publisher: &PublisherConfig) -> Result<(), ContractError> {
    if publisher.name.is_empty() {
        return Err(ContractError::config_validation(
            "publisher.name",
            "publisher name cannot be empty",
        ));
    }

    let required: &[&str] = match publisher.kind {
        PublisherKind::Log => &[],
        PublisherKind::File => &["path"],
        PublisherKind::Udp | PublisherKind::Tcp => &["addr"],
    };
    for key in required {
        if publisher.params.get(*key).is_none_or(|v| v.is_empty()) {
            return Err(ContractError::config_validation(
                format!("publisher.params.{key}"),
                format!("required for {:?} publisher", publisher.kind),
            ));
        }
    }

    if let Some(format) = publisher.params.get("format") {
        if !matches!(format.as_str(), "json" | "bincode") {
            return Err(ContractError::config_validation(
                "publisher.params.format",
                format!("unknown format '{format}', expected json or bincode"),
            ));
        }
    }

    Ok(())
}

fn validate_archive(config: &TrackerConfig) -> Result<(), ContractError> {
    if let Some(archive) = &config.archive {
        if archive.path.as_os_str().is_empty() {
            return Err(ContractError::config_validation(
                "archive.path",
                "archive path cannot be empty",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&TrackerConfig::default()).is_ok());
    }

    #[test]
    fn test_inverted_sampling_bounds() {
        let mut config = TrackerConfig::default();
        config.sampler.minimum_sampling_distance = 40_000.0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("minimum_sampling_distance"));
    }

    #[test]
    fn test_pause_above_resume() {
        let mut config = TrackerConfig::default();
        config.sampler.pause_distance = 5.0;
        config.sampler.resume_distance = 1.0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_workers_reports_nested_field() {
        let mut config = TrackerConfig::default();
        config.queue.workers = 0;
        match validate(&config) {
            Err(ContractError::ConfigValidation { field, .. }) => {
                assert_eq!(field, "queue.workers");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = TrackerConfig::default();
        config.sampler.moving_average_length = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_udp_requires_addr() {
        let mut config = TrackerConfig::default();
        config.publisher.kind = PublisherKind::Udp;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("publisher.params.addr"));

        config.publisher.params =
            HashMap::from([("addr".to_string(), "127.0.0.1:9000".to_string())]);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_unknown_wire_format() {
        let mut config = TrackerConfig::default();
        config.publisher.kind = PublisherKind::Tcp;
        config.publisher.params = HashMap::from([
            ("addr".to_string(), "127.0.0.1:9000".to_string()),
            ("format".to_string(), "xml".to_string()),
        ]);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_backoff_ordering() {
        let mut config = TrackerConfig::default();
        config.queue.retry_backoff_ms = 60_000;
        assert!(validate(&config).is_err());
    }
}
