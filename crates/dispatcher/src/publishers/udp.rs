//! UdpPublisher - one datagram per record

use std::collections::HashMap;
use std::net::SocketAddr;

use contracts::{ContractError, FixRecord, Publisher};
use tokio::net::UdpSocket;
use tracing::{debug, instrument};

use super::WireFormat;

/// Configuration for UdpPublisher
#[derive(Debug, Clone)]
pub struct UdpPublisherConfig {
    /// Collector address
    pub addr: SocketAddr,
    /// Serialization format
    pub format: WireFormat,
    /// Max datagram size (UDP typically 65507 for IPv4)
    pub max_packet_size: usize,
}

impl UdpPublisherConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr_str = params
            .get("addr")
            .ok_or_else(|| "missing 'addr' parameter".to_string())?;

        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|e| format!("invalid address '{}': {}", addr_str, e))?;

        let format = WireFormat::from_param(params.get("format").map(String::as_str))?;

        let max_packet_size = params
            .get("max_packet_size")
            .and_then(|s| s.parse().ok())
            .unwrap_or(65000);

        Ok(Self {
            addr,
            format,
            max_packet_size,
        })
    }
}

/// Publisher that sends records over UDP
///
/// Success means the datagram was handed to the socket; nothing is
/// acknowledged by the collector.
pub struct UdpPublisher {
    name: String,
    config: UdpPublisherConfig,
    socket: UdpSocket,
}

impl UdpPublisher {
    /// Create a new UdpPublisher
    #[instrument(name = "udp_publisher_new", skip(name, config))]
    pub async fn new(name: impl Into<String>, config: UdpPublisherConfig) -> std::io::Result<Self> {
        let name = name.into();
        let bind: SocketAddr = if config.addr.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(bind).await?;
        socket.connect(&config.addr).await?;

        debug!(publisher = %name, target = %config.addr, "UdpPublisher connected");

        Ok(Self {
            name,
            config,
            socket,
        })
    }

    /// Create from params (for factory)
    #[instrument(name = "udp_publisher_from_params", skip(name, params))]
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = UdpPublisherConfig::from_params(params)
            .map_err(|e| ContractError::publisher_connection(&name, e))?;

        Self::new(name.clone(), config)
            .await
            .map_err(|e| ContractError::publisher_connection(&name, e.to_string()))
    }

    fn prepare_payload(&self, record: &FixRecord) -> Result<Vec<u8>, ContractError> {
        let data = self
            .config
            .format
            .encode(record)
            .map_err(|e| ContractError::publish_failed(&self.name, e))?;

        if data.len() > self.config.max_packet_size {
            return Err(ContractError::publish_failed(
                &self.name,
                format!(
                    "datagram of {} bytes exceeds max_packet_size {}",
                    data.len(),
                    self.config.max_packet_size
                ),
            ));
        }
        Ok(data)
    }
}

impl Publisher for UdpPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "udp_publisher_send",
        skip(self, record),
        fields(publisher = %self.name, t = record.timestamp)
    )]
    async fn send(&self, record: &FixRecord) -> Result<bool, ContractError> {
        let data = self.prepare_payload(record)?;
        let sent = self
            .socket
            .send(&data)
            .await
            .map_err(|e| ContractError::publish_failed(&self.name, e.to_string()))?;
        debug!(publisher = %self.name, bytes = sent, "Sent");
        Ok(true)
    }

    #[instrument(name = "udp_publisher_close", skip(self))]
    async fn close(&self) -> Result<(), ContractError> {
        debug!(publisher = %self.name, "UdpPublisher closed");
        Ok(())
    }
}
