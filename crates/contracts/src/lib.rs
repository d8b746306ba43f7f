//! # Contracts
//!
//! Frozen interface contracts shared by every stage of the relay: decoded
//! sentences, the per-epoch blob, fix records, configuration and the
//! publisher trait. Business crates depend only on this crate, never on
//! each other.
//!
//! ## Time Model
//! - Receiver UTC time of day plus RMC date, folded into epoch seconds
//! - `FixRecord::timestamp` is the only clock downstream of the aggregator

mod macros;

mod blob;
mod config;
mod error;
mod fix;
mod publisher;
mod sentence;

pub use blob::*;
pub use config::*;
pub use error::*;
pub use fix::*;
pub use publisher::{LocalPublisher, Publisher};
pub use sentence::*;
