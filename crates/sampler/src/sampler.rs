//! Adaptive sampler implementation.

use contracts::{EpochFix, FixRecord, SamplerConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::dynamic::dynamic_sampling_distance;
use crate::error::SamplerError;
use crate::geo::{cyclical_course, haversine};
use crate::stats::WindowStats;
use crate::window::{SampleWindow, Update};

/// Why a record was emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionReason {
    /// Vehicle came to rest
    Pause,
    /// Vehicle started moving again
    Resume,
    /// Accumulated distance crossed the dynamic threshold
    Threshold,
}

impl EmissionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            EmissionReason::Pause => "pause",
            EmissionReason::Resume => "resume",
            EmissionReason::Threshold => "threshold",
        }
    }
}

/// One record selected for delivery
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Emission {
    pub record: FixRecord,
    pub reason: EmissionReason,
}

/// Distance-based decimator with park/move hysteresis
///
/// Pure state machine: it never touches the queue, the caller enqueues the
/// returned emissions.
#[derive(Debug)]
pub struct AdaptiveSampler {
    /// Configuration
    config: SamplerConfig,
    /// Recent accepted updates
    window: SampleWindow,
    /// Last accepted fix, whether or not it was emitted
    previous_raw: Option<FixRecord>,
    /// Last emitted update
    last_emitted: Option<Update>,
    /// Parked
    paused: bool,
    /// Threshold used by the last replay
    last_threshold: Option<f64>,
}

impl AdaptiveSampler {
    /// Create a sampler; the configuration is checked the same way the setters check it
    pub fn new(config: SamplerConfig) -> Result<Self, SamplerError> {
        check_config(&config)?;
        Ok(Self {
            window: SampleWindow::new(config.moving_average_length),
            config,
            previous_raw: None,
            last_emitted: None,
            paused: false,
            last_threshold: None,
        })
    }

    /// Feed one epoch fix, get back the records to forward (possibly none)
    #[instrument(name = "sampler_process_update", level = "trace", skip(self, fix), fields(t = ?fix.timestamp))]
    pub fn process_update(&mut self, fix: &EpochFix) -> Result<Vec<Emission>, SamplerError> {
        if !fix.status.is_valid() {
            return Err(SamplerError::NotValid(fix.status));
        }
        let record = self.complete_record(fix)?;
        ensure_finite(&record)?;

        let distance_change = self
            .previous_raw
            .map(|prev| haversine(prev.lat, prev.lon, record.lat, record.lon))
            .unwrap_or(0.0);
        self.previous_raw = Some(record);

        let update = Update {
            record,
            distance_change,
            cyclical_course: cyclical_course(record.course),
            status: fix.status,
        };
        self.window.insert(update);

        let stats = WindowStats::compute(&self.window);
        trace!(
            samples = stats.samples,
            mean_distance = stats.mean_distance,
            mean_speed = stats.mean_speed,
            stdev_course = stats.stdev_course,
            "window stats"
        );

        let mut emissions = Vec::new();
        if stats.mean_distance < self.config.pause_distance && !self.paused {
            emissions.push(self.emit(update, EmissionReason::Pause));
            self.paused = true;
        } else if stats.mean_distance > self.config.resume_distance && self.paused {
            emissions.push(self.emit(update, EmissionReason::Resume));
            self.paused = false;
        } else if !self.paused {
            self.replay_window(&stats, &mut emissions);
        }

        Ok(emissions)
    }

    /// Build a record from a possibly partial fix
    ///
    /// Only time and position are required. Receivers leave course blank
    /// while stationary, so course and altitude carry forward from the
    /// previous accepted fix (0 before the first one) and speed falls
    /// back to 0.
    fn complete_record(&self, fix: &EpochFix) -> Result<FixRecord, SamplerError> {
        let timestamp = fix.timestamp.ok_or(SamplerError::MissingField("timestamp"))?;
        let lat = fix.lat.ok_or(SamplerError::MissingField("lat"))?;
        let lon = fix.lon.ok_or(SamplerError::MissingField("lon"))?;

        if fix.course.is_none() || fix.speed_over_ground.is_none() || fix.altitude.is_none() {
            trace!(
                course = fix.course.is_some(),
                speed = fix.speed_over_ground.is_some(),
                altitude = fix.altitude.is_some(),
                "partial fix completed"
            );
        }
        let previous = self.previous_raw;
        Ok(FixRecord {
            timestamp,
            lon,
            lat,
            speed_over_ground: fix.speed_over_ground.unwrap_or(0.0),
            course: fix
                .course
                .or(previous.map(|p| p.course))
                .unwrap_or(0.0),
            altitude: fix
                .altitude
                .or(previous.map(|p| p.altitude))
                .unwrap_or(0.0),
        })
    }

    /// Walk the window oldest → newest and emit every point where the
    /// accumulated distance crosses the dynamic threshold
    fn replay_window(&mut self, stats: &WindowStats, emissions: &mut Vec<Emission>) {
        let ratio = stats
            .volatility_ratio()
            .clamp(0.0, self.config.volatility_clamp);
        let threshold = dynamic_sampling_distance(
            ratio,
            self.config.minimum_sampling_distance,
            self.config.maximum_sampling_distance,
            self.config.volatility_clamp,
        );
        self.last_threshold = Some(threshold);
        metrics::histogram!("gnss_relay_sampling_threshold_meters").record(threshold);

        // The leg from the last emitted point counts toward the first entry
        let first_key = self.window.first_key();
        let mut previous = self
            .last_emitted
            .filter(|e| first_key.is_some_and(|k| e.record.timestamp < k))
            .map(|e| e.record);
        let mut running = 0.0;
        let mut crossed = Vec::new();

        for update in self.window.iter() {
            if let Some(p) = previous {
                running += haversine(p.lat, p.lon, update.record.lat, update.record.lon);
            }
            previous = Some(update.record);
            if running > threshold {
                crossed.push(*update);
                running = 0.0;
            }
        }

        for update in crossed {
            emissions.push(self.emit(update, EmissionReason::Threshold));
        }
    }

    fn emit(&mut self, update: Update, reason: EmissionReason) -> Emission {
        self.window.discard_through(update.record.timestamp);
        self.last_emitted = Some(update);
        debug!(
            t = update.record.timestamp,
            reason = reason.as_str(),
            remaining = self.window.len(),
            "record emitted"
        );
        Emission {
            record: update.record,
            reason,
        }
    }

    /// Current configuration
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Parked flag
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Entries currently buffered
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Threshold used by the most recent replay
    pub fn last_threshold(&self) -> Option<f64> {
        self.last_threshold
    }

    /// Last record handed out
    pub fn last_emitted(&self) -> Option<FixRecord> {
        self.last_emitted.map(|u| u.record)
    }

    pub fn set_minimum_sampling_distance(&mut self, meters: f64) -> Result<(), SamplerError> {
        self.apply(|c| c.minimum_sampling_distance = meters)
    }

    pub fn set_maximum_sampling_distance(&mut self, meters: f64) -> Result<(), SamplerError> {
        self.apply(|c| c.maximum_sampling_distance = meters)
    }

    pub fn set_volatility_clamp(&mut self, clamp: f64) -> Result<(), SamplerError> {
        self.apply(|c| c.volatility_clamp = clamp)
    }

    pub fn set_pause_distance(&mut self, meters: f64) -> Result<(), SamplerError> {
        self.apply(|c| c.pause_distance = meters)
    }

    pub fn set_resume_distance(&mut self, meters: f64) -> Result<(), SamplerError> {
        self.apply(|c| c.resume_distance = meters)
    }

    /// Resize the window; shrinking evicts the oldest entries
    pub fn set_moving_average_length(&mut self, length: usize) -> Result<(), SamplerError> {
        self.apply(|c| c.moving_average_length = length)
    }

    /// Replace the whole configuration at once
    pub fn reconfigure(&mut self, config: SamplerConfig) -> Result<(), SamplerError> {
        self.apply(|c| *c = config)
    }

    fn apply(&mut self, change: impl FnOnce(&mut SamplerConfig)) -> Result<(), SamplerError> {
        let mut candidate = self.config.clone();
        change(&mut candidate);
        check_config(&candidate)?;

        let evicted = self.window.resize(candidate.moving_average_length);
        if evicted > 0 {
            debug!(evicted, "window shrunk");
        }
        self.config = candidate;
        Ok(())
    }
}

fn ensure_finite(record: &FixRecord) -> Result<(), SamplerError> {
    let fields = [
        ("lat", record.lat),
        ("lon", record.lon),
        ("speed_over_ground", record.speed_over_ground),
        ("course", record.course),
        ("altitude", record.altitude),
    ];
    match fields.into_iter().find(|(_, v)| !v.is_finite()) {
        Some((name, _)) => Err(SamplerError::NonFinite(name)),
        None => Ok(()),
    }
}

fn check_config(config: &SamplerConfig) -> Result<(), SamplerError> {
    let positive = [
        ("minimum_sampling_distance", config.minimum_sampling_distance),
        ("maximum_sampling_distance", config.maximum_sampling_distance),
        ("volatility_clamp", config.volatility_clamp),
    ];
    for (field, value) in positive {
        if !(value.is_finite() && value > 0.0) {
            return Err(SamplerError::setting(field, format!("must be > 0, got {value}")));
        }
    }
    for (field, value) in [
        ("pause_distance", config.pause_distance),
        ("resume_distance", config.resume_distance),
    ] {
        if !(value.is_finite() && value >= 0.0) {
            return Err(SamplerError::setting(field, format!("must be >= 0, got {value}")));
        }
    }

    if config.minimum_sampling_distance >= config.maximum_sampling_distance {
        return Err(SamplerError::setting(
            "minimum_sampling_distance",
            format!(
                "{} must be below maximum_sampling_distance {}",
                config.minimum_sampling_distance, config.maximum_sampling_distance
            ),
        ));
    }
    if config.pause_distance > config.resume_distance {
        return Err(SamplerError::setting(
            "pause_distance",
            format!(
                "{} must not exceed resume_distance {}",
                config.pause_distance, config.resume_distance
            ),
        ));
    }
    if config.moving_average_length == 0 {
        return Err(SamplerError::setting("moving_average_length", "must be >= 1"));
    }
    Ok(())
}
