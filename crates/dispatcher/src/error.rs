//! Dispatcher error types

use std::path::PathBuf;

use thiserror::Error;

/// Durable queue errors
#[derive(Debug, Error)]
pub enum QueueError {
    /// Filesystem operation on the queue directory failed
    #[error("queue storage error at '{path}': {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Record could not be serialized
    #[error("queue item {position} could not be encoded: {source}")]
    Encode {
        position: u64,
        #[source]
        source: serde_json::Error,
    },

    /// ack/release for a position nobody holds
    #[error("queue item {0} is not in flight")]
    NotInFlight(u64),
}

impl QueueError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }
}

impl From<QueueError> for contracts::ContractError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Storage { path, source } => contracts::ContractError::QueueStorage {
                path: path.display().to_string(),
                message: source.to_string(),
            },
            QueueError::Encode { position, source } => contracts::ContractError::QueueCorrupt {
                position,
                message: source.to_string(),
            },
            QueueError::NotInFlight(position) => {
                contracts::ContractError::Other(format!("queue item {position} is not in flight"))
            }
        }
    }
}

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Publisher creation error
    #[error("failed to create publisher '{name}': {message}")]
    PublisherCreation { name: String, message: String },

    /// Queue error
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// Publisher error (from contract)
    #[error("publisher error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a publisher creation error
    pub fn publisher_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PublisherCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
