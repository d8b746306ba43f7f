//! Fix records - aggregator and sampler output
//!
//! `EpochFix` is what one epoch yields (any field may be missing when a
//! conversion failed). `FixRecord` is the complete, minimized record that
//! the sampler windows and the delivery queue persists.

use serde::{Deserialize, Serialize};

/// Receiver-reported validity of a fix
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixStatus {
    /// RMC status `A`
    Valid,
    /// RMC status `V`
    Void,
    /// Status missing or unrecognized
    #[default]
    Unknown,
}

impl FixStatus {
    /// Map the RMC status character
    pub fn from_flag(flag: Option<char>) -> Self {
        match flag {
            Some('A') | Some('a') => FixStatus::Valid,
            Some('V') | Some('v') => FixStatus::Void,
            _ => FixStatus::Unknown,
        }
    }

    pub fn is_valid(self) -> bool {
        self == FixStatus::Valid
    }
}

/// Minimized epoch output, possibly partially populated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpochFix {
    /// Epoch seconds (UTC)
    pub timestamp: Option<i64>,
    /// Signed decimal degrees
    pub lat: Option<f64>,
    /// Signed decimal degrees
    pub lon: Option<f64>,
    /// Speed over ground (knots)
    pub speed_over_ground: Option<f64>,
    /// Course over ground (degrees)
    pub course: Option<f64>,
    /// Altitude (meters)
    pub altitude: Option<f64>,
    /// Fix status
    pub status: FixStatus,
}

/// Complete minimized record
///
/// Serializes to exactly `{t, lon, lat, s, c, a}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixRecord {
    /// Epoch seconds (UTC)
    #[serde(rename = "t")]
    pub timestamp: i64,
    pub lon: f64,
    pub lat: f64,
    /// Speed over ground (knots)
    #[serde(rename = "s")]
    pub speed_over_ground: f64,
    /// Course over ground (degrees)
    #[serde(rename = "c")]
    pub course: f64,
    /// Altitude (meters)
    #[serde(rename = "a")]
    pub altitude: f64,
}

impl TryFrom<&EpochFix> for FixRecord {
    /// Name of the first missing field
    type Error = &'static str;

    fn try_from(fix: &EpochFix) -> Result<Self, Self::Error> {
        Ok(Self {
            timestamp: fix.timestamp.ok_or("timestamp")?,
            lat: fix.lat.ok_or("lat")?,
            lon: fix.lon.ok_or("lon")?,
            speed_over_ground: fix.speed_over_ground.ok_or("speed_over_ground")?,
            course: fix.course.ok_or("course")?,
            altitude: fix.altitude.ok_or("altitude")?,
        })
    }
}

impl From<FixRecord> for EpochFix {
    fn from(record: FixRecord) -> Self {
        Self {
            timestamp: Some(record.timestamp),
            lat: Some(record.lat),
            lon: Some(record.lon),
            speed_over_ground: Some(record.speed_over_ground),
            course: Some(record.course),
            altitude: Some(record.altitude),
            status: FixStatus::Valid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_with_short_keys() {
        let record = FixRecord {
            timestamp: 1_600_000_000,
            lon: -0.1278,
            lat: 51.5074,
            speed_over_ground: 12.5,
            course: 270.0,
            altitude: 35.0,
        };

        let value = serde_json::to_value(record).unwrap();
        let obj = value.as_object().unwrap();
        let mut keys: Vec<_> = obj.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["a", "c", "lat", "lon", "s", "t"]);
        assert_eq!(obj["t"], 1_600_000_000);
    }

    #[test]
    fn partial_epoch_reports_missing_field() {
        let fix = EpochFix {
            timestamp: Some(1),
            lat: Some(1.0),
            lon: Some(2.0),
            speed_over_ground: Some(0.0),
            course: None,
            altitude: Some(3.0),
            status: FixStatus::Valid,
        };
        assert_eq!(FixRecord::try_from(&fix), Err("course"));
    }

    #[test]
    fn status_flags() {
        assert_eq!(FixStatus::from_flag(Some('A')), FixStatus::Valid);
        assert_eq!(FixStatus::from_flag(Some('V')), FixStatus::Void);
        assert_eq!(FixStatus::from_flag(None), FixStatus::Unknown);
    }
}
