//! Relay orchestration module.

mod orchestrator;
mod signal;
mod stats;

pub use orchestrator::{InputMode, Relay, RelayConfig};
pub use signal::shutdown_signal;
pub use stats::RelayStats;
