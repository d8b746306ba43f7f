//! LogPublisher - logs each record via tracing

use contracts::{ContractError, FixRecord, Publisher};
use tracing::{info, instrument};

/// Publisher that only logs; every record counts as delivered
pub struct LogPublisher {
    name: String,
}

impl LogPublisher {
    /// Create a new LogPublisher with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Publisher for LogPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_publisher_send",
        skip(self, record),
        fields(publisher = %self.name, t = record.timestamp)
    )]
    async fn send(&self, record: &FixRecord) -> Result<bool, ContractError> {
        info!(
            publisher = %self.name,
            t = record.timestamp,
            lat = record.lat,
            lon = record.lon,
            s = record.speed_over_ground,
            c = record.course,
            a = record.altitude,
            "record published"
        );
        Ok(true)
    }

    #[instrument(name = "log_publisher_close", skip(self))]
    async fn close(&self) -> Result<(), ContractError> {
        info!(publisher = %self.name, "LogPublisher closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_publisher_accepts() {
        let publisher = LogPublisher::new("my_logger");
        let record = FixRecord {
            timestamp: 1,
            lon: 0.0,
            lat: 0.0,
            speed_over_ground: 0.0,
            course: 0.0,
            altitude: 0.0,
        };

        assert_eq!(publisher.name(), "my_logger");
        assert!(publisher.send(&record).await.unwrap());
    }
}
