//! TcpPublisher - newline-delimited JSON with per-record acknowledgement

use std::collections::HashMap;
use std::time::Duration;

use contracts::{ContractError, FixRecord, Publisher};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

/// Reply line that marks a record as accepted
const ACK: &str = "OK";

/// Configuration for TcpPublisher
#[derive(Debug, Clone)]
pub struct TcpPublisherConfig {
    /// Collector `host:port`
    pub addr: String,
    /// How long to wait for the acknowledgement line
    pub ack_timeout: Duration,
    /// How long to wait for a connection
    pub connect_timeout: Duration,
}

impl TcpPublisherConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr = params
            .get("addr")
            .filter(|a| !a.is_empty())
            .ok_or_else(|| "missing 'addr' parameter".to_string())?
            .clone();

        let millis = |key: &str, default: u64| -> Result<Duration, String> {
            match params.get(key) {
                Some(v) => v
                    .parse()
                    .map(Duration::from_millis)
                    .map_err(|e| format!("invalid '{key}' value '{v}': {e}")),
                None => Ok(Duration::from_millis(default)),
            }
        };

        Ok(Self {
            addr,
            ack_timeout: millis("ack_timeout_ms", 5000)?,
            connect_timeout: millis("connect_timeout_ms", 3000)?,
        })
    }
}

/// Publisher that streams records to a TCP collector
///
/// The connection is opened lazily and dropped on any I/O error, so the next
/// send reconnects. Workers take turns on the single connection.
pub struct TcpPublisher {
    name: String,
    config: TcpPublisherConfig,
    conn: Mutex<Option<BufReader<TcpStream>>>,
}

impl TcpPublisher {
    pub fn new(name: impl Into<String>, config: TcpPublisherConfig) -> Self {
        Self {
            name: name.into(),
            config,
            conn: Mutex::new(None),
        }
    }

    /// Create from params (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = TcpPublisherConfig::from_params(params)
            .map_err(|e| ContractError::publisher_connection(&name, e))?;
        Ok(Self::new(name, config))
    }

    async fn connect(&self) -> Result<BufReader<TcpStream>, ContractError> {
        let stream = timeout(
            self.config.connect_timeout,
            TcpStream::connect(self.config.addr.as_str()),
        )
        .await
        .map_err(|_| ContractError::publisher_connection(&self.name, "connect timed out"))?
        .map_err(|e| ContractError::publisher_connection(&self.name, e.to_string()))?;
        stream.set_nodelay(true)?;

        debug!(publisher = %self.name, target = %self.config.addr, "TcpPublisher connected");
        Ok(BufReader::new(stream))
    }

    /// Write one line and read the reply
    async fn exchange(
        &self,
        conn: &mut BufReader<TcpStream>,
        line: &[u8],
    ) -> Result<String, ContractError> {
        conn.get_mut()
            .write_all(line)
            .await
            .map_err(|e| ContractError::publish_failed(&self.name, e.to_string()))?;

        let mut reply = String::new();
        let read = timeout(self.config.ack_timeout, conn.read_line(&mut reply))
            .await
            .map_err(|_| ContractError::publish_failed(&self.name, "acknowledgement timed out"))?
            .map_err(|e| ContractError::publish_failed(&self.name, e.to_string()))?;
        if read == 0 {
            return Err(ContractError::publish_failed(
                &self.name,
                "collector closed the connection",
            ));
        }
        Ok(reply.trim().to_string())
    }
}

impl Publisher for TcpPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "tcp_publisher_send",
        skip(self, record),
        fields(publisher = %self.name, t = record.timestamp)
    )]
    async fn send(&self, record: &FixRecord) -> Result<bool, ContractError> {
        let mut line = serde_json::to_vec(record)
            .map_err(|e| ContractError::publish_failed(&self.name, e.to_string()))?;
        line.push(b'\n');

        let mut guard = self.conn.lock().await;
        let mut conn = match guard.take() {
            Some(conn) => conn,
            None => self.connect().await?,
        };

        // The connection is only put back after a complete exchange
        let reply = self.exchange(&mut conn, &line).await?;
        *guard = Some(conn);

        if reply == ACK {
            Ok(true)
        } else {
            warn!(publisher = %self.name, %reply, "collector rejected record");
            Ok(false)
        }
    }

    #[instrument(name = "tcp_publisher_close", skip(self))]
    async fn close(&self) -> Result<(), ContractError> {
        if let Some(mut conn) = self.conn.lock().await.take() {
            conn.get_mut().shutdown().await?;
        }
        debug!(publisher = %self.name, "TcpPublisher closed");
        Ok(())
    }
}
