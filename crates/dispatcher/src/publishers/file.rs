//! FilePublisher - appends one JSON line per record

use std::collections::HashMap;
use std::path::PathBuf;

use contracts::{ContractError, FixRecord, Publisher};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Configuration for FilePublisher
#[derive(Debug, Clone)]
pub struct FilePublisherConfig {
    /// Output file (JSON lines)
    pub path: PathBuf,
}

impl FilePublisherConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let path = params
            .get("path")
            .filter(|p| !p.is_empty())
            .ok_or_else(|| "missing 'path' parameter".to_string())?;
        Ok(Self {
            path: PathBuf::from(path),
        })
    }
}

/// Publisher that appends records to a local file
///
/// Workers share one handle; writes are serialized so lines never interleave.
pub struct FilePublisher {
    name: String,
    config: FilePublisherConfig,
    file: Mutex<File>,
}

impl FilePublisher {
    /// Create a new FilePublisher, creating parent directories as needed
    pub async fn new(name: impl Into<String>, config: FilePublisherConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)
            .await?;

        Ok(Self {
            name: name.into(),
            config,
            file: Mutex::new(file),
        })
    }

    /// Create from params map (for factory)
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = FilePublisherConfig::from_params(params)
            .map_err(|e| ContractError::publisher_connection(&name, e))?;
        Self::new(name.clone(), config)
            .await
            .map_err(|e| ContractError::publisher_connection(&name, e.to_string()))
    }

    pub fn path(&self) -> &PathBuf {
        &self.config.path
    }
}

impl Publisher for FilePublisher {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_publisher_send",
        skip(self, record),
        fields(publisher = %self.name, t = record.timestamp)
    )]
    async fn send(&self, record: &FixRecord) -> Result<bool, ContractError> {
        let mut line = serde_json::to_vec(record)
            .map_err(|e| ContractError::publish_failed(&self.name, e.to_string()))?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line)
            .await
            .map_err(|e| ContractError::publish_failed(&self.name, e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| ContractError::publish_failed(&self.name, e.to_string()))?;
        Ok(true)
    }

    #[instrument(name = "file_publisher_close", skip(self))]
    async fn close(&self) -> Result<(), ContractError> {
        self.file.lock().await.sync_all().await?;
        debug!(publisher = %self.name, "FilePublisher closed");
        Ok(())
    }
}
