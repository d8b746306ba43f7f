//! Coordinate and time conversion
//!
//! NMEA carries positions as `ddmm.mmmm` / `dddmm.mmmm` text plus a hemisphere
//! letter. The decimal result is rounded to as many places as the minutes
//! field carried.

use chrono::{NaiveDate, NaiveTime};

use crate::error::CoordinateError;

/// `ddmm.mmmm` + hemisphere -> signed decimal degrees
pub fn nmea_to_decimal(value: &str, hemisphere: char) -> Result<f64, CoordinateError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CoordinateError::Empty);
    }

    let (sign, limit) = match hemisphere.to_ascii_uppercase() {
        'N' => (1.0, 90.0),
        'S' => (-1.0, 90.0),
        'E' => (1.0, 180.0),
        'W' => (-1.0, 180.0),
        other => return Err(CoordinateError::Hemisphere(other)),
    };

    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    let digits_only = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if whole.len() < 2 || !digits_only(whole) || !digits_only(fraction) {
        return Err(CoordinateError::Malformed(value.to_string()));
    }

    let (degree_text, minute_text) = whole.split_at(whole.len() - 2);
    let degrees: f64 = if degree_text.is_empty() {
        0.0
    } else {
        degree_text
            .parse()
            .map_err(|_| CoordinateError::Malformed(value.to_string()))?
    };
    let minutes: f64 = format!("{minute_text}.{fraction}")
        .trim_end_matches('.')
        .parse()
        .map_err(|_| CoordinateError::Malformed(value.to_string()))?;

    if minutes >= 60.0 {
        return Err(CoordinateError::OutOfRange(value.to_string()));
    }
    let decimal = degrees + minutes / 60.0;
    if decimal > limit {
        return Err(CoordinateError::OutOfRange(value.to_string()));
    }

    Ok(sign * round_to(decimal, fraction.len()))
}

/// Signed decimal degrees -> (`ddmm.mmmm` text, hemisphere)
///
/// `precision` is the number of minute decimals to write.
pub fn decimal_to_nmea(value: f64, is_latitude: bool, precision: usize) -> (String, char) {
    let hemisphere = match (is_latitude, value < 0.0) {
        (true, false) => 'N',
        (true, true) => 'S',
        (false, false) => 'E',
        (false, true) => 'W',
    };

    let magnitude = value.abs();
    let mut degrees = magnitude.trunc();
    let mut minutes = round_to((magnitude - degrees) * 60.0, precision);
    if minutes >= 60.0 {
        degrees += 1.0;
        minutes = 0.0;
    }

    let degree_width = if is_latitude { 2 } else { 3 };
    let minute_width = if precision == 0 { 2 } else { precision + 3 };
    let text = format!(
        "{:0dw$}{:0mw$.p$}",
        degrees as u32,
        minutes,
        dw = degree_width,
        mw = minute_width,
        p = precision
    );
    (text, hemisphere)
}

/// UTC epoch seconds from receiver date and time of day
pub fn epoch_seconds(date: NaiveDate, time: NaiveTime) -> i64 {
    date.and_time(time).and_utc().timestamp()
}

fn round_to(value: f64, places: usize) -> f64 {
    let scale = 10f64.powi(places as i32);
    (value * scale).round() / scale
}
