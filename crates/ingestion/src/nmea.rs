//! NMEA-0183 sentence decoder
//!
//! Turns one text line into a typed [`Sentence`]. Framing problems (start
//! delimiter, address, checksum) are errors; a field that is blank or does not
//! parse just comes out as `None`.

use chrono::{NaiveDate, NaiveTime};
use contracts::{
    DopData, FixData, SatelliteInfo, SatellitePart, Sentence, TrackSpeedData, TransitData,
};

use crate::error::DecodeError;

/// Decode one sentence
pub fn decode(line: &str) -> Result<Sentence, DecodeError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(DecodeError::Empty);
    }

    let body = line
        .strip_prefix('$')
        .or_else(|| line.strip_prefix('!'))
        .ok_or(DecodeError::MissingStart)?;

    let body = match body.split_once('*') {
        Some((data, checksum)) => {
            verify_checksum(data, checksum)?;
            data
        }
        None => body,
    };

    let fields = Fields(body.split(',').collect());
    let address = fields.0[0];
    let (talker, kind) = split_address(address)?;

    let sentence = match kind {
        "GSV" => Sentence::Gsv(fields.satellite_part()),
        "GGA" => Sentence::Gga(fields.fix_data()),
        "VTG" => Sentence::Vtg(fields.track_speed()),
        "RMC" => Sentence::Rmc(fields.transit()),
        "GSA" => Sentence::Gsa(fields.dop()),
        _ => Sentence::Other {
            talker: talker.to_string(),
            sentence_type: kind.to_string(),
        },
    };
    Ok(sentence)
}

/// XOR of every byte between the start delimiter and `*`
pub fn checksum(data: &str) -> u8 {
    data.bytes().fold(0, |acc, b| acc ^ b)
}

fn verify_checksum(data: &str, field: &str) -> Result<(), DecodeError> {
    let field = field.trim();
    if field.len() != 2 {
        return Err(DecodeError::BadChecksumField(field.to_string()));
    }
    let expected = u8::from_str_radix(field, 16)
        .map_err(|_| DecodeError::BadChecksumField(field.to_string()))?;
    let computed = checksum(data);
    if expected != computed {
        return Err(DecodeError::ChecksumMismatch { expected, computed });
    }
    Ok(())
}

/// `GPGGA` -> (`GP`, `GGA`); proprietary `PUBX` -> (`P`, `UBX`)
fn split_address(address: &str) -> Result<(&str, &str), DecodeError> {
    let well_formed = address.is_ascii() && address.chars().all(|c| c.is_ascii_alphanumeric());
    if well_formed && address.len() == 5 {
        return Ok(address.split_at(2));
    }
    if well_formed && address.len() > 1 && address.starts_with('P') {
        return Ok(address.split_at(1));
    }
    Err(DecodeError::BadAddress(address.to_string()))
}

/// Positional field access; out-of-range or blank fields read as `None`
struct Fields<'a>(Vec<&'a str>);

impl<'a> Fields<'a> {
    fn raw(&self, idx: usize) -> Option<&'a str> {
        self.0
            .get(idx)
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
    }

    fn text(&self, idx: usize) -> Option<String> {
        self.raw(idx).map(str::to_string)
    }

    fn float(&self, idx: usize) -> Option<f64> {
        self.raw(idx)?.parse().ok()
    }

    fn int<T: std::str::FromStr>(&self, idx: usize) -> Option<T> {
        self.raw(idx)?.parse().ok()
    }

    fn flag(&self, idx: usize) -> Option<char> {
        self.raw(idx)?.chars().next()
    }

    /// `hhmmss[.sss]`
    fn time(&self, idx: usize) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(self.raw(idx)?, "%H%M%S%.f").ok()
    }

    /// `ddmmyy`
    fn date(&self, idx: usize) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.raw(idx)?, "%d%m%y").ok()
    }

    fn satellite_part(&self) -> SatellitePart {
        // Trailing signal-id field (NMEA 4.1) leaves an incomplete tuple; ignore it
        let tuples = self.0.len().saturating_sub(4) / 4;
        let satellites = (0..tuples)
            .map(|n| {
                let base = 4 + n * 4;
                SatelliteInfo {
                    prn: self.int(base),
                    elevation: self.float(base + 1),
                    azimuth: self.float(base + 2),
                    snr: self.float(base + 3),
                }
            })
            .filter(|s| {
                s.prn.is_some() || s.elevation.is_some() || s.azimuth.is_some() || s.snr.is_some()
            })
            .collect();

        SatellitePart {
            total_parts: self.int(1),
            part_index: self.int(2),
            satellites_in_view: self.int(3),
            satellites,
        }
    }

    fn fix_data(&self) -> FixData {
        FixData {
            timestamp: self.time(1),
            lat: self.text(2),
            lat_dir: self.flag(3),
            lon: self.text(4),
            lon_dir: self.flag(5),
            quality: self.int(6),
            num_satellites: self.int(7),
            horizontal_dilution: self.float(8),
            altitude: self.float(9),
            altitude_units: self.flag(10),
            geoid_separation: self.float(11),
            geoid_separation_units: self.flag(12),
            age_of_differential: self.float(13),
            reference_station_id: self.text(14),
        }
    }

    fn track_speed(&self) -> TrackSpeedData {
        TrackSpeedData {
            true_track: self.float(1),
            magnetic_track: self.float(3),
            speed_knots: self.float(5),
            speed_kmph: self.float(7),
            faa_mode: self.flag(9),
        }
    }

    fn transit(&self) -> TransitData {
        TransitData {
            timestamp: self.time(1),
            status: self.flag(2),
            lat: self.text(3),
            lat_dir: self.flag(4),
            lon: self.text(5),
            lon_dir: self.flag(6),
            speed_over_ground: self.float(7),
            true_course: self.float(8),
            datestamp: self.date(9),
            magnetic_variation: self.float(10),
            magnetic_variation_dir: self.flag(11),
        }
    }

    fn dop(&self) -> DopData {
        let ids: Vec<u16> = (3..=14).filter_map(|idx| self.int(idx)).collect();
        DopData {
            mode: self.flag(1),
            fix_type: self.int(2),
            satellite_ids: (!ids.is_empty()).then_some(ids),
            pdop: self.float(15),
            hdop: self.float(16),
            vdop: self.float(17),
        }
    }
}

/// Frame a sentence body with start delimiter and checksum
pub fn frame(body: &str) -> String {
    format!("${body}*{:02X}", checksum(body))
}
