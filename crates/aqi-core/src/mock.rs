//! Mock provider for testing.
//!
//! [`MockProvider`] implements [`AirQualityProvider`] without touching the
//! network, so the acquisition pipeline and the HTTP layer can be tested
//! against both a healthy and a failing upstream.
//!
//! # Features
//!
//! - **Failure injection**: fail every call until told otherwise
//! - **Call counting**: check which upstream endpoints were hit
//! - **Custom data**: replace the entries returned on success

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;

use aqi_types::{AirQualityEntry, AqiLevel, Coordinates, PollutantComponents, ReadingEnvelope, Source};

use crate::error::{Result, UpstreamError};
use crate::upstream::AirQualityProvider;

/// A mock upstream provider.
///
/// # Example
///
/// ```
/// use aqi_core::{AirQualityProvider, MockProvider};
///
/// #[tokio::main]
/// async fn main() {
///     let provider = MockProvider::new();
///     assert!(provider.current(51.5, -0.12).await.is_ok());
///
///     provider.set_should_fail(true);
///     assert!(provider.current(51.5, -0.12).await.is_err());
///     assert_eq!(provider.current_calls(), 2);
/// }
/// ```
#[derive(Debug)]
pub struct MockProvider {
    entries: RwLock<Vec<AirQualityEntry>>,
    should_fail: AtomicBool,
    current_calls: AtomicU32,
    forecast_calls: AtomicU32,
    history_calls: AtomicU32,
    probe_calls: AtomicU32,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Create a healthy mock provider returning one default entry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(vec![Self::default_entry()]),
            should_fail: AtomicBool::new(false),
            current_calls: AtomicU32::new(0),
            forecast_calls: AtomicU32::new(0),
            history_calls: AtomicU32::new(0),
            probe_calls: AtomicU32::new(0),
        }
    }

    /// Create a provider that fails every call.
    pub fn failing() -> Self {
        let provider = Self::new();
        provider.set_should_fail(true);
        provider
    }

    fn default_entry() -> AirQualityEntry {
        AirQualityEntry::new(
            1_700_000_000,
            AqiLevel::Fair,
            PollutantComponents {
                co: Some(201.94),
                no: Some(0.02),
                no2: Some(0.77),
                o3: Some(68.66),
                so2: Some(0.64),
                pm2_5: Some(0.5),
                pm10: Some(0.54),
                nh3: Some(0.12),
            },
        )
    }

    /// Replace the entries returned by successful calls.
    pub fn set_entries(&self, entries: Vec<AirQualityEntry>) {
        if let Ok(mut guard) = self.entries.write() {
            *guard = entries;
        }
    }

    /// Make every call fail (or succeed again).
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    pub fn current_calls(&self) -> u32 {
        self.current_calls.load(Ordering::Relaxed)
    }

    pub fn forecast_calls(&self) -> u32 {
        self.forecast_calls.load(Ordering::Relaxed)
    }

    pub fn history_calls(&self) -> u32 {
        self.history_calls.load(Ordering::Relaxed)
    }

    pub fn probe_calls(&self) -> u32 {
        self.probe_calls.load(Ordering::Relaxed)
    }

    /// Total calls across every endpoint.
    pub fn total_calls(&self) -> u32 {
        self.current_calls() + self.forecast_calls() + self.history_calls() + self.probe_calls()
    }

    fn check_should_fail(&self) -> Result<()> {
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(UpstreamError::Unavailable("Mock failure".to_string()));
        }
        Ok(())
    }

    fn respond(&self, lat: f64, lon: f64) -> Result<ReadingEnvelope> {
        self.check_should_fail()?;
        let list = self
            .entries
            .read()
            .map(|entries| entries.clone())
            .unwrap_or_default();
        Ok(ReadingEnvelope::new(
            Coordinates::Point { lat, lon },
            list,
            Source::OpenWeatherMap,
        ))
    }
}

#[async_trait]
impl AirQualityProvider for MockProvider {
    async fn current(&self, lat: f64, lon: f64) -> Result<ReadingEnvelope> {
        self.current_calls.fetch_add(1, Ordering::Relaxed);
        self.respond(lat, lon)
    }

    async fn forecast(&self, lat: f64, lon: f64) -> Result<ReadingEnvelope> {
        self.forecast_calls.fetch_add(1, Ordering::Relaxed);
        self.respond(lat, lon)
    }

    async fn history(&self, lat: f64, lon: f64, _start: i64, _end: i64) -> Result<ReadingEnvelope> {
        self.history_calls.fetch_add(1, Ordering::Relaxed);
        self.respond(lat, lon)
    }

    async fn probe(&self) -> Result<()> {
        self.probe_calls.fetch_add(1, Ordering::Relaxed);
        self.check_should_fail()
    }
}
