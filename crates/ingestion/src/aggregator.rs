//! FixAggregator - per-epoch sentence accumulator
//!
//! 状态机：`CollectingSatellites → Locked → Complete → (reset)`。
//! 状态从累加器内容推导，不单独存储。

use std::mem;

use contracts::{
    AggregateBlob, DopData, EpochFix, FixData, FixStatus, SatellitePart, Sentence,
    TrackSpeedData, TransitData,
};
use tracing::{debug, trace, warn};

use crate::coord::{epoch_seconds, nmea_to_decimal};

/// Aggregator state (derived)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorState {
    /// Waiting for a self-consistent set of GSV parts
    CollectingSatellites,
    /// Satellite set consistent, filling fix groups
    Locked,
    /// Lock held and every group populated; ready to extract
    Complete,
}

/// One finished epoch
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedEpoch {
    /// Minimized output (fields may be unset when a conversion failed)
    pub fix: EpochFix,
    /// Everything collected during the epoch
    pub blob: AggregateBlob,
}

/// Sentence accumulator
///
/// Exclusively owned by the ingestion task; plain `&mut self` state machine.
#[derive(Debug, Default)]
pub struct FixAggregator {
    blob: AggregateBlob,
}

impl FixAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> AggregatorState {
        if self.is_complete() {
            AggregatorState::Complete
        } else if self.blob.locked {
            AggregatorState::Locked
        } else {
            AggregatorState::CollectingSatellites
        }
    }

    /// Accumulated data of the current epoch
    pub fn blob(&self) -> &AggregateBlob {
        &self.blob
    }

    /// Drive the state machine with one decoded sentence
    ///
    /// Returns the finished epoch when this sentence completed it.
    pub fn ingest(&mut self, sentence: Sentence) -> Option<CompletedEpoch> {
        if !self.blob.locked {
            match sentence {
                Sentence::Gsv(part) => {
                    self.add_satellite_part(part);
                    if self.check_satellite_lock() {
                        debug!(
                            parts = self.blob.satellites.len(),
                            satellites = self.blob.satellites_reported(),
                            "satellite lock acquired"
                        );
                    }
                }
                other => trace!(kind = other.kind(), "ignored while collecting satellites"),
            }
            return None;
        }

        match sentence {
            Sentence::Gga(data) => self.add_fix_data(&data),
            Sentence::Vtg(data) => self.add_track_and_speed(&data),
            Sentence::Rmc(data) => self.add_transit_data(&data),
            Sentence::Gsa(data) => self.add_dop(&data),
            other => {
                trace!(kind = other.kind(), "ignored while locked");
                return None;
            }
        }

        self.is_complete().then(|| self.extract_fix_record())
    }

    /// Store one GSV part
    ///
    /// Part 1 starts a new cycle and discards whatever was collected before.
    pub fn add_satellite_part(&mut self, part: SatellitePart) {
        let Some(index) = part.part_index else {
            warn!("GSV part without part index skipped");
            return;
        };

        if index == 1 {
            self.blob.satellites.clear();
        }
        self.blob.satellites.insert(index, part);
        self.blob.locked = false;
    }

    /// Re-evaluate the satellite lock and store the result
    pub fn check_satellite_lock(&mut self) -> bool {
        self.blob.locked = Self::parts_consistent(&self.blob);
        self.blob.locked
    }

    fn parts_consistent(blob: &AggregateBlob) -> bool {
        let Some(total) = blob
            .satellites
            .values()
            .next()
            .and_then(|first| first.total_parts)
            .filter(|n| *n > 0)
        else {
            return false;
        };

        let same_total = blob
            .satellites
            .iter()
            .all(|(key, part)| part.total_parts == Some(total) && part.part_index == Some(*key));
        if !same_total {
            return false;
        }

        let n = u32::from(total);
        let in_range = blob.satellites.keys().all(|k| (1..=total).contains(k));
        let index_sum: u32 = blob.satellites.keys().map(|k| u32::from(*k)).sum();

        in_range && blob.satellites.len() == total as usize && index_sum == n * (n + 1) / 2
    }

    /// Populate the fix (GGA) group
    pub fn add_fix_data(&mut self, data: &FixData) {
        self.blob.fix.merge(data);
    }

    /// Populate the track/speed (VTG) group
    pub fn add_track_and_speed(&mut self, data: &TrackSpeedData) {
        self.blob.track_and_speed.merge(data);
    }

    /// Populate the transit (RMC) group
    pub fn add_transit_data(&mut self, data: &TransitData) {
        self.blob.transit.merge(data);
    }

    /// Populate the DOP (GSA) group
    pub fn add_dop(&mut self, data: &DopData) {
        self.blob.dop.merge(data);
    }

    /// Lock held and all four groups non-empty
    pub fn is_complete(&self) -> bool {
        self.blob.locked && self.blob.groups_complete()
    }

    /// Build the minimized record, hand out the blob and start a new epoch
    pub fn extract_fix_record(&mut self) -> CompletedEpoch {
        let blob = mem::take(&mut self.blob);
        let fix = minimize(&blob);
        debug!(
            timestamp = ?fix.timestamp,
            lat = ?fix.lat,
            lon = ?fix.lon,
            status = ?fix.status,
            "epoch complete"
        );
        CompletedEpoch { fix, blob }
    }

    /// Drop everything and go back to collecting satellites
    pub fn reset(&mut self) {
        self.blob = AggregateBlob::default();
    }
}

fn minimize(blob: &AggregateBlob) -> EpochFix {
    let (lat, lon) = position(blob);

    let time_of_day = blob.fix.timestamp.or(blob.transit.timestamp);
    let timestamp = match (blob.transit.datestamp, time_of_day) {
        (Some(date), Some(time)) => Some(epoch_seconds(date, time)),
        (date, time) => {
            warn!(
                has_date = date.is_some(),
                has_time = time.is_some(),
                "cannot build epoch time"
            );
            None
        }
    };

    EpochFix {
        timestamp,
        lat,
        lon,
        speed_over_ground: blob
            .transit
            .speed_over_ground
            .or(blob.track_and_speed.speed_knots),
        course: blob.transit.true_course.or(blob.track_and_speed.true_track),
        altitude: blob.fix.altitude,
        status: FixStatus::from_flag(blob.transit.status),
    }
}

/// Both axes from the same group: GGA first, RMC when GGA lacks a position
fn position(blob: &AggregateBlob) -> (Option<f64>, Option<f64>) {
    let gga = (&blob.fix.lat, blob.fix.lat_dir, &blob.fix.lon, blob.fix.lon_dir);
    let rmc = (
        &blob.transit.lat,
        blob.transit.lat_dir,
        &blob.transit.lon,
        blob.transit.lon_dir,
    );

    let source = match gga {
        (Some(_), Some(_), Some(_), Some(_)) => gga,
        _ => rmc,
    };
    let (lat, lat_dir, lon, lon_dir) = source;
    (axis("lat", lat, lat_dir), axis("lon", lon, lon_dir))
}

fn axis(name: &'static str, value: &Option<String>, hemisphere: Option<char>) -> Option<f64> {
    let (value, hemisphere) = match (value, hemisphere) {
        (Some(v), Some(h)) => (v, h),
        _ => {
            warn!(axis = name, "coordinate missing");
            return None;
        }
    };
    nmea_to_decimal(value, hemisphere)
        .inspect_err(|e| warn!(axis = name, value = %value, error = %e, "coordinate conversion failed"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmea::{decode, frame};
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    fn part(index: u8, total: u8) -> SatellitePart {
        SatellitePart {
            part_index: Some(index),
            total_parts: Some(total),
            satellites_in_view: Some(u16::from(total) * 4),
            satellites: Vec::new(),
        }
    }

    fn locked_aggregator(total: u8) -> FixAggregator {
        let mut agg = FixAggregator::new();
        for i in 1..=total {
            agg.add_satellite_part(part(i, total));
        }
        assert!(agg.check_satellite_lock());
        agg
    }

    fn fill_groups(agg: &mut FixAggregator) {
        agg.add_fix_data(&FixData {
            altitude: Some(35.0),
            ..Default::default()
        });
        agg.add_track_and_speed(&TrackSpeedData {
            speed_knots: Some(1.0),
            ..Default::default()
        });
        agg.add_transit_data(&TransitData {
            status: Some('A'),
            ..Default::default()
        });
        agg.add_dop(&DopData {
            pdop: Some(1.2),
            ..Default::default()
        });
    }

    #[test]
    fn lock_for_consistent_parts_in_any_order() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let total: u8 = rng.random_range(1..=9);
            let mut rest: Vec<u8> = (2..=total).collect();
            rest.shuffle(&mut rng);

            let mut agg = FixAggregator::new();
            agg.add_satellite_part(part(1, total));
            for i in rest {
                agg.add_satellite_part(part(i, total));
            }
            assert!(agg.check_satellite_lock(), "total = {total}");
            assert_eq!(agg.state(), AggregatorState::Locked);
        }
    }

    #[test]
    fn no_lock_when_a_part_is_missing() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let total: u8 = rng.random_range(2..=9);
            let missing: u8 = rng.random_range(2..=total);

            let mut agg = FixAggregator::new();
            for i in (1..=total).filter(|i| *i != missing) {
                agg.add_satellite_part(part(i, total));
            }
            assert!(!agg.check_satellite_lock());
        }
    }

    #[test]
    fn no_lock_for_duplicates_or_mixed_totals() {
        let mut agg = FixAggregator::new();
        agg.add_satellite_part(part(1, 3));
        agg.add_satellite_part(part(2, 3));
        agg.add_satellite_part(part(2, 3));
        assert!(!agg.check_satellite_lock());

        let mut agg = FixAggregator::new();
        agg.add_satellite_part(part(1, 2));
        agg.add_satellite_part(part(2, 3));
        assert!(!agg.check_satellite_lock());

        let mut agg = FixAggregator::new();
        agg.add_satellite_part(part(1, 2));
        agg.add_satellite_part(SatellitePart {
            part_index: Some(2),
            total_parts: None,
            ..Default::default()
        });
        assert!(!agg.check_satellite_lock());
    }

    #[test]
    fn no_lock_for_empty_or_zero_total() {
        let mut agg = FixAggregator::new();
        assert!(!agg.check_satellite_lock());

        agg.add_satellite_part(part(1, 0));
        assert!(!agg.check_satellite_lock());
    }

    #[test]
    fn out_of_range_indices_do_not_lock() {
        // {1, 5, 0}-style sets can satisfy count and sum checks alone
        let mut agg = FixAggregator::new();
        agg.add_satellite_part(part(1, 3));
        agg.add_satellite_part(part(0, 3));
        agg.add_satellite_part(part(5, 3));
        assert!(!agg.check_satellite_lock());
    }

    #[test]
    fn part_one_restarts_the_cycle() {
        let mut agg = FixAggregator::new();
        agg.add_satellite_part(part(1, 2));
        agg.add_satellite_part(part(2, 2));
        agg.add_satellite_part(part(1, 3));
        assert_eq!(agg.blob().satellites.len(), 1);
        assert!(!agg.check_satellite_lock());
    }

    #[test]
    fn mutation_clears_lock() {
        let mut agg = locked_aggregator(2);
        agg.add_satellite_part(part(2, 2));
        assert!(!agg.blob().locked);
        assert_eq!(agg.state(), AggregatorState::CollectingSatellites);
    }

    #[test]
    fn part_without_index_is_skipped() {
        let mut agg = FixAggregator::new();
        agg.add_satellite_part(SatellitePart {
            total_parts: Some(1),
            ..Default::default()
        });
        assert!(agg.blob().satellites.is_empty());
    }

    #[test]
    fn complete_needs_lock_and_every_group() {
        let mut agg = locked_aggregator(1);
        fill_groups(&mut agg);
        assert!(agg.is_complete());
        assert_eq!(agg.state(), AggregatorState::Complete);

        for skip in 0..4 {
            let mut agg = locked_aggregator(1);
            if skip != 0 {
                agg.add_fix_data(&FixData {
                    quality: Some(1),
                    ..Default::default()
                });
            }
            if skip != 1 {
                agg.add_track_and_speed(&TrackSpeedData {
                    true_track: Some(10.0),
                    ..Default::default()
                });
            }
            if skip != 2 {
                agg.add_transit_data(&TransitData {
                    status: Some('A'),
                    ..Default::default()
                });
            }
            if skip != 3 {
                agg.add_dop(&DopData {
                    fix_type: Some(3),
                    ..Default::default()
                });
            }
            assert!(!agg.is_complete(), "group {skip} missing");
        }

        let mut unlocked = FixAggregator::new();
        fill_groups(&mut unlocked);
        assert!(!unlocked.is_complete());
    }

    #[test]
    fn groups_ignored_until_locked() {
        let mut agg = FixAggregator::new();
        let gga = decode(&frame("GPGGA,120000,5130.4440,N,00007.6680,W,1,08,0.9,35.0,M,46.9,M,,"))
            .unwrap();
        assert!(agg.ingest(gga).is_none());
        assert!(agg.blob().fix.is_empty());
    }

    #[test]
    fn full_epoch_from_sentences() {
        let lines = [
            frame("GPGSV,3,1,11,03,03,111,00,04,15,270,00,06,01,010,00,13,06,292,00"),
            frame("GPGSV,3,2,11,14,25,170,00,16,57,208,39,18,67,296,40,19,40,246,00"),
            frame("GPGSV,3,3,11,22,42,067,42,24,14,311,43,27,05,244,00"),
            frame("GPGGA,123519,5130.4440,N,00007.6680,W,1,08,0.9,35.0,M,46.9,M,,"),
            frame("GPVTG,084.4,T,,M,022.4,N,041.5,K,A"),
            frame("GPGSA,A,3,04,16,18,22,24,,,,,,,,2.5,1.3,2.1"),
            frame("GPRMC,123519,A,5130.4440,N,00007.6680,W,022.4,084.4,230394,003.1,W"),
        ];

        let mut agg = FixAggregator::new();
        let mut completed = None;
        for line in &lines {
            let sentence = decode(line).unwrap();
            if let Some(epoch) = agg.ingest(sentence) {
                completed = Some(epoch);
            }
        }

        let epoch = completed.expect("epoch should complete on the last sentence");
        assert_eq!(epoch.fix.lat, Some(51.5074));
        assert_eq!(epoch.fix.lon, Some(-0.1278));
        assert_eq!(epoch.fix.timestamp, Some(764_426_119));
        assert_eq!(epoch.fix.speed_over_ground, Some(22.4));
        assert_eq!(epoch.fix.course, Some(84.4));
        assert_eq!(epoch.fix.altitude, Some(35.0));
        assert!(epoch.fix.status.is_valid());
        assert_eq!(epoch.blob.satellites.len(), 3);
        assert_eq!(epoch.blob.satellites_reported(), 11);

        assert_eq!(agg.state(), AggregatorState::CollectingSatellites);
        assert!(agg.blob().fix.is_empty());
    }

    #[test]
    fn speed_and_course_fall_back_to_track_group() {
        let mut agg = locked_aggregator(1);
        agg.add_fix_data(&FixData {
            lat: Some("4807.038".into()),
            lat_dir: Some('N'),
            lon: Some("01131.000".into()),
            lon_dir: Some('E'),
            ..Default::default()
        });
        agg.add_track_and_speed(&TrackSpeedData {
            true_track: Some(54.7),
            speed_knots: Some(5.5),
            ..Default::default()
        });
        agg.add_transit_data(&TransitData {
            status: Some('A'),
            ..Default::default()
        });
        agg.add_dop(&DopData {
            pdop: Some(2.5),
            ..Default::default()
        });

        let epoch = agg.extract_fix_record();
        assert_eq!(epoch.fix.speed_over_ground, Some(5.5));
        assert_eq!(epoch.fix.course, Some(54.7));
        assert_eq!(epoch.fix.lat, Some(48.117));
        assert_eq!(epoch.fix.lon, Some(11.517));
        assert_eq!(epoch.fix.timestamp, None);
    }

    #[test]
    fn bad_coordinate_leaves_field_unset() {
        let mut agg = locked_aggregator(1);
        fill_groups(&mut agg);
        agg.add_fix_data(&FixData {
            lat: Some("51x0.4440".into()),
            lat_dir: Some('N'),
            lon: Some("00007.6680".into()),
            lon_dir: Some('W'),
            ..Default::default()
        });

        let epoch = agg.extract_fix_record();
        assert_eq!(epoch.fix.lat, None);
        assert_eq!(epoch.fix.lon, Some(-0.1278));
    }

    #[test]
    fn reset_returns_to_collecting() {
        let mut agg = locked_aggregator(2);
        fill_groups(&mut agg);
        agg.reset();
        assert_eq!(agg.state(), AggregatorState::CollectingSatellites);
        assert!(agg.blob().satellites.is_empty());
    }
}
