//! Sentence - decoder output
//!
//! Typed NMEA-0183 sentences. Every attribute is optional: a field the
//! receiver left blank (or that failed to parse) is `None`, never an error.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::macros::field_group;

/// Decoded sentence, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "UPPERCASE")]
pub enum Sentence {
    /// Satellites in view (one part of a multi-part cycle)
    Gsv(SatellitePart),
    /// Fix data
    Gga(FixData),
    /// Track made good and ground speed
    Vtg(TrackSpeedData),
    /// Recommended minimum transit data
    Rmc(TransitData),
    /// DOP and active satellites
    Gsa(DopData),
    /// Any other sentence type (ignored downstream)
    Other { talker: String, sentence_type: String },
}

impl Sentence {
    /// Three-letter sentence type
    pub fn kind(&self) -> &str {
        match self {
            Sentence::Gsv(_) => "GSV",
            Sentence::Gga(_) => "GGA",
            Sentence::Vtg(_) => "VTG",
            Sentence::Rmc(_) => "RMC",
            Sentence::Gsa(_) => "GSA",
            Sentence::Other { sentence_type, .. } => sentence_type,
        }
    }
}

/// One satellite tuple inside a GSV part
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SatelliteInfo {
    /// Satellite PRN number
    pub prn: Option<u16>,
    /// Elevation (degrees)
    pub elevation: Option<f64>,
    /// Azimuth (degrees, true)
    pub azimuth: Option<f64>,
    /// Signal-to-noise ratio (dB-Hz)
    pub snr: Option<f64>,
}

/// One GSV fragment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SatellitePart {
    /// Index of this part within the cycle (1-based)
    pub part_index: Option<u8>,
    /// Number of parts in the cycle
    pub total_parts: Option<u8>,
    /// Total satellites in view
    pub satellites_in_view: Option<u16>,
    /// Up to four satellite tuples
    pub satellites: Vec<SatelliteInfo>,
}

/// GGA fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixData {
    pub timestamp: Option<NaiveTime>,
    /// Latitude as received (`ddmm.mmmm`), kept textual to preserve precision
    pub lat: Option<String>,
    pub lat_dir: Option<char>,
    /// Longitude as received (`dddmm.mmmm`)
    pub lon: Option<String>,
    pub lon_dir: Option<char>,
    /// Fix quality (0 = invalid, 1 = GPS, 2 = DGPS, ...)
    pub quality: Option<u8>,
    pub num_satellites: Option<u8>,
    pub horizontal_dilution: Option<f64>,
    /// Antenna altitude above mean sea level
    pub altitude: Option<f64>,
    pub altitude_units: Option<char>,
    pub geoid_separation: Option<f64>,
    pub geoid_separation_units: Option<char>,
    pub age_of_differential: Option<f64>,
    pub reference_station_id: Option<String>,
}

field_group!(FixData {
    timestamp,
    lat,
    lat_dir,
    lon,
    lon_dir,
    quality,
    num_satellites,
    horizontal_dilution,
    altitude,
    altitude_units,
    geoid_separation,
    geoid_separation_units,
    age_of_differential,
    reference_station_id,
});

/// VTG fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackSpeedData {
    pub true_track: Option<f64>,
    pub magnetic_track: Option<f64>,
    pub speed_knots: Option<f64>,
    pub speed_kmph: Option<f64>,
    pub faa_mode: Option<char>,
}

field_group!(TrackSpeedData {
    true_track,
    magnetic_track,
    speed_knots,
    speed_kmph,
    faa_mode,
});

/// RMC fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitData {
    pub timestamp: Option<NaiveTime>,
    /// `A` = valid, `V` = void
    pub status: Option<char>,
    pub lat: Option<String>,
    pub lat_dir: Option<char>,
    pub lon: Option<String>,
    pub lon_dir: Option<char>,
    /// Speed over ground (knots)
    pub speed_over_ground: Option<f64>,
    /// Course over ground (degrees, true)
    pub true_course: Option<f64>,
    pub datestamp: Option<NaiveDate>,
    pub magnetic_variation: Option<f64>,
    pub magnetic_variation_dir: Option<char>,
}

field_group!(TransitData {
    timestamp,
    status,
    lat,
    lat_dir,
    lon,
    lon_dir,
    speed_over_ground,
    true_course,
    datestamp,
    magnetic_variation,
    magnetic_variation_dir,
});

/// GSA fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DopData {
    /// `M` = manual, `A` = automatic 2D/3D
    pub mode: Option<char>,
    /// 1 = no fix, 2 = 2D, 3 = 3D
    pub fix_type: Option<u8>,
    /// PRNs of satellites used in the solution
    pub satellite_ids: Option<Vec<u16>>,
    pub pdop: Option<f64>,
    pub hdop: Option<f64>,
    pub vdop: Option<f64>,
}

field_group!(DopData {
    mode,
    fix_type,
    satellite_ids,
    pdop,
    hdop,
    vdop,
});
