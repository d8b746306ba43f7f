//! Publisher trait - delivery output interface
//!
//! Defines the abstract interface to the remote collector. The worker pool
//! shares one publisher instance between all of its workers.

use crate::{ContractError, FixRecord};

/// Record delivery trait
///
/// All publisher implementations must implement this trait. Connection and
/// reconnection are the publisher's own business.
#[trait_variant::make(Publisher: Send)]
pub trait LocalPublisher {
    /// Publisher name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Deliver one record
    ///
    /// `Ok(true)` means the collector accepted the record. `Ok(false)` and
    /// `Err(_)` are both treated as a transient failure and retried.
    async fn send(&self, record: &FixRecord) -> Result<bool, ContractError>;

    /// Release connections / flush buffers
    async fn close(&self) -> Result<(), ContractError>;
}
