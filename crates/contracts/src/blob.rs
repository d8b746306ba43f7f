//! AggregateBlob - per-epoch accumulator
//!
//! Owned exclusively by the fix aggregator; handed out whole (for archival)
//! when an epoch completes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{DopData, FixData, SatellitePart, TrackSpeedData, TransitData};

/// Everything collected during one epoch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateBlob {
    /// Satellite parts keyed by part index
    pub satellites: BTreeMap<u8, SatellitePart>,

    /// GGA group
    pub fix: FixData,

    /// VTG group
    pub track_and_speed: TrackSpeedData,

    /// RMC group
    pub transit: TransitData,

    /// GSA group
    pub dop: DopData,

    /// Set only by a successful satellite-lock check; cleared by any part mutation
    pub locked: bool,
}

impl AggregateBlob {
    /// True when every non-satellite group holds at least one field
    pub fn groups_complete(&self) -> bool {
        !self.fix.is_empty()
            && !self.track_and_speed.is_empty()
            && !self.transit.is_empty()
            && !self.dop.is_empty()
    }

    /// Number of satellites reported across all stored parts
    pub fn satellites_reported(&self) -> usize {
        self.satellites.values().map(|p| p.satellites.len()).sum()
    }
}
