//! Synthetic air quality readings.
//!
//! When the provider cannot be reached the service answers with generated
//! data instead of an error. Readings are plausible rather than accurate:
//! a random base intensity is scaled by a regional multiplier (the Beijing
//! and Shanghai areas run dirtier) and a diurnal factor that is lowest at
//! noon UTC and highest at midnight, and every pollutant is an independent
//! draw scaled by that intensity.
//!
//! [`Generator`] is generic over the random source so tests can seed it.
//!
//! # Example
//!
//! ```
//! use aqi_core::synthetic::Generator;
//! use aqi_types::Source;
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let mut generator = Generator::with_rng(StdRng::seed_from_u64(7));
//! let envelope = generator.generate_range(51.5074, -0.1278, 0, 3 * 3600);
//!
//! assert_eq!(envelope.len(), 4);
//! assert_eq!(envelope.source, Source::SyntheticFallback);
//! ```

use rand::Rng;
use rand::rngs::ThreadRng;
use time::OffsetDateTime;
use tracing::info;

use aqi_types::locations::{BEIJING, SHANGHAI};
use aqi_types::{
    AirQualityEntry, AqiLevel, Coordinates, KNOWN_LOCATIONS, PollutantComponents, ReadingEnvelope,
    Source,
};

/// Regional multiplier radius in degrees.
const REGION_RADIUS_DEG: f64 = 1.0;

const HOUR: i64 = 3600;

/// Number of points in a synthetic forecast.
pub const FORECAST_POINTS: i64 = 32;
/// Spacing of synthetic forecast points in hours.
pub const FORECAST_STEP_HOURS: i64 = 3;

/// Samples generated per known location.
pub const SAMPLES_PER_LOCATION: i64 = 16;
/// Spacing of samples in hours, counting back from now.
pub const SAMPLE_STEP_HOURS: i64 = 3;

/// Generator of synthetic readings.
#[derive(Debug)]
pub struct Generator<R = ThreadRng> {
    rng: R,
}

impl Generator<ThreadRng> {
    /// A generator backed by the thread-local RNG.
    pub fn new() -> Self {
        Self { rng: rand::rng() }
    }
}

impl Default for Generator<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> Generator<R> {
    /// A generator backed by the given RNG.
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Generate a single entry for the given place and time.
    pub fn entry(&mut self, lat: f64, lon: f64, timestamp: i64) -> AirQualityEntry {
        let intensity = self.rng.random_range(0.3..=0.8)
            * regional_multiplier(lat, lon)
            * diurnal_factor(timestamp);

        let aqi = AqiLevel::saturating_from((1.0 + intensity * 4.0).round() as i64);

        let rng = &mut self.rng;
        let components = PollutantComponents {
            co: Some(200.0 + rng.random_range(-50.0..300.0) * intensity),
            no: Some(rng.random_range(0.0..10.0) * intensity),
            no2: Some(rng.random_range(0.0..50.0) * intensity),
            o3: Some(60.0 + rng.random_range(-20.0..40.0) * intensity),
            so2: Some(rng.random_range(0.0..20.0) * intensity),
            pm2_5: Some(rng.random_range(0.0..75.0) * intensity),
            pm10: Some(rng.random_range(0.0..150.0) * intensity),
            nh3: Some(rng.random_range(0.0..10.0) * intensity),
        };

        AirQualityEntry::new(timestamp, aqi, components)
    }

    /// Generate an envelope with exactly one entry.
    ///
    /// The timestamp defaults to the current time.
    pub fn generate(&mut self, lat: f64, lon: f64, timestamp: Option<i64>) -> ReadingEnvelope {
        let timestamp = timestamp.unwrap_or_else(now);
        let entry = self.entry(lat, lon, timestamp);
        synthetic_envelope(lat, lon, vec![entry])
    }

    /// Generate one entry per hour from `start` to `end`, inclusive.
    ///
    /// Returns an empty envelope when `end < start`.
    pub fn generate_range(&mut self, lat: f64, lon: f64, start: i64, end: i64) -> ReadingEnvelope {
        let mut list = Vec::new();
        let mut timestamp = start;
        while timestamp <= end {
            list.push(self.entry(lat, lon, timestamp));
            timestamp += HOUR;
        }

        info!(
            "Generated {} historical data points for location ({}, {})",
            list.len(),
            lat,
            lon
        );

        synthetic_envelope(lat, lon, list)
    }

    /// Generate a forecast of [`FORECAST_POINTS`] entries every
    /// [`FORECAST_STEP_HOURS`] hours, starting at `now`.
    pub fn generate_forecast(&mut self, lat: f64, lon: f64, now: i64) -> ReadingEnvelope {
        let list = (0..FORECAST_POINTS)
            .map(|i| self.entry(lat, lon, now + i * FORECAST_STEP_HOURS * HOUR))
            .collect();
        synthetic_envelope(lat, lon, list)
    }

    /// Generate single-entry sample envelopes for every known location,
    /// [`SAMPLES_PER_LOCATION`] per location going back from `now`.
    ///
    /// Each sample carries its location's name.
    pub fn generate_samples(&mut self, now: i64) -> Vec<ReadingEnvelope> {
        let mut samples = Vec::with_capacity(KNOWN_LOCATIONS.len() * SAMPLES_PER_LOCATION as usize);
        for location in KNOWN_LOCATIONS {
            for i in 0..SAMPLES_PER_LOCATION {
                let timestamp = now - i * SAMPLE_STEP_HOURS * HOUR;
                samples.push(
                    self.generate(location.lat, location.lon, Some(timestamp))
                        .with_location_name(location.name),
                );
            }
        }
        samples
    }
}

fn synthetic_envelope(lat: f64, lon: f64, list: Vec<AirQualityEntry>) -> ReadingEnvelope {
    ReadingEnvelope::new(Coordinates::pair(lat, lon), list, Source::SyntheticFallback)
}

/// Multiplier for the more polluted regions.
fn regional_multiplier(lat: f64, lon: f64) -> f64 {
    if BEIJING.is_near(lat, lon, REGION_RADIUS_DEG) {
        1.5
    } else if SHANGHAI.is_near(lat, lon, REGION_RADIUS_DEG) {
        1.3
    } else {
        1.0
    }
}

/// `1 + 0.3 * |hour - 12| / 12`, using the UTC hour of `timestamp`.
fn diurnal_factor(timestamp: i64) -> f64 {
    let hour = timestamp.rem_euclid(86_400) / HOUR;
    1.0 + 0.3 * (hour - 12).abs() as f64 / 12.0
}

/// Current Unix time in seconds.
pub(crate) fn now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}
