//! Publisher implementations
//!
//! Contains LogPublisher, FilePublisher, UdpPublisher and TcpPublisher, plus
//! the config-driven factory.

mod file;
mod log;
mod tcp;
mod udp;

use contracts::{ContractError, FixRecord, Publisher, PublisherConfig, PublisherKind};
use tracing::instrument;

use crate::error::DispatcherError;

pub use self::file::{FilePublisher, FilePublisherConfig};
pub use self::log::LogPublisher;
pub use self::tcp::{TcpPublisher, TcpPublisherConfig};
pub use self::udp::{UdpPublisher, UdpPublisherConfig};

/// Serialization format for datagrams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    /// JSON (human-readable, larger)
    #[default]
    Json,
    /// Bincode (binary, compact)
    Bincode,
}

impl WireFormat {
    pub(crate) fn from_param(value: Option<&str>) -> Result<Self, String> {
        match value {
            Some("bincode") => Ok(WireFormat::Bincode),
            Some("json") | None => Ok(WireFormat::Json),
            Some(other) => Err(format!("unknown format '{}'", other)),
        }
    }

    pub(crate) fn encode(self, record: &FixRecord) -> Result<Vec<u8>, String> {
        match self {
            WireFormat::Json => serde_json::to_vec(record).map_err(|e| format!("json error: {}", e)),
            WireFormat::Bincode => {
                bincode::serialize(record).map_err(|e| format!("bincode error: {}", e))
            }
        }
    }
}

/// Any configured publisher, so the worker pool stays monomorphic
pub enum AnyPublisher {
    Log(LogPublisher),
    File(FilePublisher),
    Udp(UdpPublisher),
    Tcp(TcpPublisher),
}

impl Publisher for AnyPublisher {
    fn name(&self) -> &str {
        match self {
            AnyPublisher::Log(p) => p.name(),
            AnyPublisher::File(p) => p.name(),
            AnyPublisher::Udp(p) => p.name(),
            AnyPublisher::Tcp(p) => p.name(),
        }
    }

    async fn send(&self, record: &FixRecord) -> Result<bool, ContractError> {
        match self {
            AnyPublisher::Log(p) => p.send(record).await,
            AnyPublisher::File(p) => p.send(record).await,
            AnyPublisher::Udp(p) => p.send(record).await,
            AnyPublisher::Tcp(p) => p.send(record).await,
        }
    }

    async fn close(&self) -> Result<(), ContractError> {
        match self {
            AnyPublisher::Log(p) => p.close().await,
            AnyPublisher::File(p) => p.close().await,
            AnyPublisher::Udp(p) => p.close().await,
            AnyPublisher::Tcp(p) => p.close().await,
        }
    }
}

/// Create the publisher described by configuration
#[instrument(
    name = "dispatcher_create_publisher",
    skip(config),
    fields(publisher = %config.name, kind = ?config.kind)
)]
pub async fn create_publisher(config: &PublisherConfig) -> Result<AnyPublisher, DispatcherError> {
    let creation = |e: ContractError| DispatcherError::publisher_creation(&config.name, e.to_string());
    match config.kind {
        PublisherKind::Log => Ok(AnyPublisher::Log(LogPublisher::new(&config.name))),
        PublisherKind::File => FilePublisher::from_params(&config.name, &config.params)
            .await
            .map(AnyPublisher::File)
            .map_err(creation),
        PublisherKind::Udp => UdpPublisher::from_params(&config.name, &config.params)
            .await
            .map(AnyPublisher::Udp)
            .map_err(creation),
        PublisherKind::Tcp => TcpPublisher::from_params(&config.name, &config.params)
            .map(AnyPublisher::Tcp)
            .map_err(creation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_create_log_publisher_from_config() {
        let config = PublisherConfig {
            name: "test_log".to_string(),
            kind: PublisherKind::Log,
            params: HashMap::new(),
        };
        let publisher = create_publisher(&config).await.unwrap();
        assert!(matches!(publisher, AnyPublisher::Log(_)));
        assert_eq!(publisher.name(), "test_log");
    }

    #[tokio::test]
    async fn test_missing_params_fail_creation() {
        for kind in [PublisherKind::File, PublisherKind::Udp, PublisherKind::Tcp] {
            let config = PublisherConfig {
                name: "broken".to_string(),
                kind,
                params: HashMap::new(),
            };
            let err = create_publisher(&config).await.err().unwrap();
            assert!(matches!(err, DispatcherError::PublisherCreation { .. }));
        }
    }

    #[test]
    fn test_bincode_is_smaller_than_json() {
        let record = FixRecord {
            timestamp: 1_600_000_000,
            lon: -0.1278,
            lat: 51.5074,
            speed_over_ground: 20.0,
            course: 90.0,
            altitude: 35.0,
        };
        let json = WireFormat::Json.encode(&record).unwrap();
        let bin = WireFormat::Bincode.encode(&record).unwrap();
        assert_eq!(bin.len(), 48);
        assert!(bin.len() < json.len());
    }
}
