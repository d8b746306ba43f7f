//! Layered error definitions
//!
//! Categorized by source: config / queue / publisher

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Queue Errors =====
    /// Durable queue storage error
    #[error("queue storage error at '{path}': {message}")]
    QueueStorage { path: String, message: String },

    /// Queued item could not be encoded or decoded
    #[error("queue item {position} corrupt: {message}")]
    QueueCorrupt { position: u64, message: String },

    // ===== Publisher Errors =====
    /// Publisher send error
    #[error("publisher '{publisher}' send error: {message}")]
    PublishFailed { publisher: String, message: String },

    /// Publisher connection error
    #[error("publisher '{publisher}' connection error: {message}")]
    PublisherConnection { publisher: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create publisher send error
    pub fn publish_failed(publisher: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PublishFailed {
            publisher: publisher.into(),
            message: message.into(),
        }
    }

    /// Create publisher connection error
    pub fn publisher_connection(publisher: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PublisherConnection {
            publisher: publisher.into(),
            message: message.into(),
        }
    }
}
