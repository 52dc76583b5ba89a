//! The acquisition pipeline.
//!
//! [`AcquisitionService`] decides, per request, whether data comes from the
//! upstream provider, the local store, or the synthetic generator. Every
//! upstream failure is logged and answered with synthetic data, so callers
//! always get an envelope back.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use aqi_store::Store;
use aqi_types::{Observation, ReadingEnvelope, Source, resolve_location};

use crate::samples::SampleTable;
use crate::synthetic::{self, Generator};
use crate::upstream::AirQualityProvider;

/// Result of the upstream availability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    Available,
    Unavailable,
}

impl ApiStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiStatus::Available => "available",
            ApiStatus::Unavailable => "unavailable",
        }
    }
}

impl std::fmt::Display for ApiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Long-lived service shared by every request handler.
pub struct AcquisitionService {
    provider: Arc<dyn AirQualityProvider>,
    store: Arc<Mutex<Store>>,
    samples: SampleTable,
}

impl AcquisitionService {
    pub fn new(
        provider: Arc<dyn AirQualityProvider>,
        store: Arc<Mutex<Store>>,
        samples: SampleTable,
    ) -> Self {
        Self {
            provider,
            store,
            samples,
        }
    }

    /// The shared store handle.
    pub fn store(&self) -> &Arc<Mutex<Store>> {
        &self.store
    }

    /// The sample table used by the current-conditions fallback.
    pub fn samples(&self) -> &SampleTable {
        &self.samples
    }

    /// Current conditions, falling back to synthetic data.
    ///
    /// The result is not persisted; see [`AcquisitionService::persist`].
    pub async fn current(&self, lat: f64, lon: f64) -> ReadingEnvelope {
        match self.provider.current(lat, lon).await {
            Ok(envelope) => envelope,
            Err(e) => {
                error!("API error: {}", e);
                self.current_fallback(lat, lon)
            }
        }
    }

    /// Synthetic current conditions.
    ///
    /// Prefers the first pre-generated sample near the coordinate over a
    /// freshly generated reading. A known location's name replaces any
    /// name the sample carries.
    pub fn current_fallback(&self, lat: f64, lon: f64) -> ReadingEnvelope {
        let mut envelope = match self.samples.find(lat, lon) {
            Some(sample) => sample.clone(),
            None => Generator::new().generate(lat, lon, None),
        };

        if let Some(name) = resolve_location(lat, lon) {
            envelope.location_name = Some(name.to_string());
        }
        envelope.source = Source::SyntheticFallback;
        envelope
    }

    /// Forecast, falling back to a synthetic forecast starting now.
    pub async fn forecast(&self, lat: f64, lon: f64) -> ReadingEnvelope {
        match self.provider.forecast(lat, lon).await {
            Ok(envelope) => envelope,
            Err(e) => {
                error!("Forecast API error: {}", e);
                Generator::new().generate_forecast(lat, lon, synthetic::now())
            }
        }
    }

    /// History for `[start, end]`, falling back to one synthetic reading
    /// per hour of the range.
    pub async fn historical(&self, lat: f64, lon: f64, start: i64, end: i64) -> ReadingEnvelope {
        match self.provider.history(lat, lon, start, end).await {
            Ok(envelope) => envelope,
            Err(e) => {
                error!("Historical API error: {}", e);
                info!("API failed, generating bulk historical data for ({}, {})", lat, lon);
                Generator::new().generate_range(lat, lon, start, end)
            }
        }
    }

    /// Stored observations near the coordinate within `[start, end]`,
    /// oldest first. Storage failures yield an empty result.
    pub async fn historical_from_store(
        &self,
        lat: f64,
        lon: f64,
        start: i64,
        end: i64,
    ) -> Vec<Observation> {
        self.store.lock().await.query_range(lat, lon, start, end)
    }

    /// Number of stored observations the same query would return.
    pub async fn count_stored(&self, lat: f64, lon: f64, start: i64, end: i64) -> u64 {
        self.store.lock().await.count_range(lat, lon, start, end)
    }

    /// Persist an envelope; returns the number of rows written.
    pub async fn persist(&self, envelope: &ReadingEnvelope, location_name: Option<&str>) -> usize {
        self.store
            .lock()
            .await
            .insert_envelope(envelope, location_name)
    }

    /// Probe the provider. Never fails; the result is informational only.
    pub async fn check_availability(&self) -> ApiStatus {
        match self.provider.probe().await {
            Ok(()) => ApiStatus::Available,
            Err(e) => {
                warn!("API availability check failed: {}", e);
                ApiStatus::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;
    use aqi_types::{Coordinates, KNOWN_LOCATIONS};

    fn service_with(provider: Arc<MockProvider>, samples: SampleTable) -> AcquisitionService {
        let store = Store::open_in_memory().unwrap();
        AcquisitionService::new(provider, Arc::new(Mutex::new(store)), samples)
    }

    #[tokio::test]
    async fn test_current_from_upstream() {
        let provider = Arc::new(MockProvider::new());
        let service = service_with(provider.clone(), SampleTable::default());

        let envelope = service.current(51.5074, -0.1278).await;
        assert_eq!(envelope.source, Source::OpenWeatherMap);
        assert_eq!(envelope.location_name, None);
        assert_eq!(provider.current_calls(), 1);
    }

    #[tokio::test]
    async fn test_current_fallback_generates_with_location_name() {
        let service = service_with(Arc::new(MockProvider::failing()), SampleTable::default());

        let envelope = service.current(39.95, 116.40).await;
        assert_eq!(envelope.source, Source::SyntheticFallback);
        assert_eq!(envelope.len(), 1);
        assert_eq!(envelope.location_name.as_deref(), Some("Beijing"));
        assert_eq!(envelope.coord, Coordinates::pair(39.95, 116.40));
    }

    #[tokio::test]
    async fn test_current_fallback_unknown_location() {
        let service = service_with(Arc::new(MockProvider::failing()), SampleTable::default());

        let envelope = service.current(-33.8688, 151.2093).await;
        assert_eq!(envelope.source, Source::SyntheticFallback);
        assert_eq!(envelope.len(), 1);
        assert_eq!(envelope.location_name, None);
    }

    #[tokio::test]
    async fn test_current_fallback_prefers_samples() {
        let samples = SampleTable::generate(1_000_000);
        let service = service_with(Arc::new(MockProvider::failing()), samples);

        // Within 1° of London's samples but too far to resolve as London
        let envelope = service.current(51.9, -0.5).await;
        assert_eq!(envelope.source, Source::SyntheticFallback);
        assert_eq!(envelope.list[0].dt, 1_000_000);
        assert_eq!(envelope.coord, KNOWN_LOCATIONS[1].coordinates());
        // The sample keeps its own name
        assert_eq!(envelope.location_name.as_deref(), Some("London"));
    }

    #[tokio::test]
    async fn test_resolved_name_overrides_sample_name() {
        let sample = ReadingEnvelope::new(
            Coordinates::pair(35.7, 139.7),
            vec![Generator::new().entry(35.7, 139.7, 5)],
            Source::SyntheticFallback,
        )
        .with_location_name("Somewhere Near Tokyo");
        let service = service_with(Arc::new(MockProvider::failing()), SampleTable::new(vec![sample]));

        let envelope = service.current(35.6762, 139.6503).await;
        assert_eq!(envelope.location_name.as_deref(), Some("Tokyo"));
        assert_eq!(envelope.list[0].dt, 5);
    }

    #[tokio::test]
    async fn test_forecast_fallback() {
        let service = service_with(Arc::new(MockProvider::failing()), SampleTable::default());

        let envelope = service.forecast(51.5074, -0.1278).await;
        assert_eq!(envelope.source, Source::SyntheticFallback);
        assert_eq!(envelope.len(), 32);
        assert_eq!(envelope.list[1].dt - envelope.list[0].dt, 3 * 3600);
    }

    #[tokio::test]
    async fn test_historical_fallback_covers_range() {
        let provider = Arc::new(MockProvider::failing());
        let service = service_with(provider.clone(), SampleTable::default());

        let envelope = service.historical(1.0, 2.0, 0, 48 * 3600).await;
        assert_eq!(envelope.source, Source::SyntheticFallback);
        assert_eq!(envelope.len(), 49);
        // No retries
        assert_eq!(provider.history_calls(), 1);
    }

    #[tokio::test]
    async fn test_persist_and_read_back() {
        let service = service_with(Arc::new(MockProvider::failing()), SampleTable::default());

        let envelope = service.historical(1.0, 2.0, 0, 5 * 3600).await;
        assert_eq!(service.persist(&envelope, Some("Test")).await, 6);

        let rows = service.historical_from_store(1.0, 2.0, 0, 5 * 3600).await;
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].location_name.as_deref(), Some("Test"));
        assert_eq!(rows[0].source, Source::SyntheticFallback);
        assert_eq!(service.count_stored(1.0, 2.0, 0, 3600).await, 2);
    }

    #[tokio::test]
    async fn test_check_availability() {
        let provider = Arc::new(MockProvider::new());
        let service = service_with(provider.clone(), SampleTable::default());
        assert_eq!(service.check_availability().await, ApiStatus::Available);

        provider.set_should_fail(true);
        assert_eq!(service.check_availability().await, ApiStatus::Unavailable);
        assert_eq!(provider.probe_calls(), 2);
    }

    #[test]
    fn test_api_status_serialization() {
        assert_eq!(serde_json::to_string(&ApiStatus::Available).unwrap(), "\"available\"");
        assert_eq!(ApiStatus::Unavailable.to_string(), "unavailable");
    }
}
