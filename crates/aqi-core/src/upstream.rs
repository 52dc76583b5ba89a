//! Upstream pollution provider.
//!
//! [`AirQualityProvider`] abstracts over the real OpenWeatherMap client and
//! [`MockProvider`](crate::mock::MockProvider), so acquisition and backfill
//! can be tested with injected failures.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::debug;

use aqi_types::locations::NEW_YORK;
use aqi_types::{AirQualityEntry, Coordinates, ReadingEnvelope, Source};

use crate::error::{Result, UpstreamError};

/// Default OpenWeatherMap air pollution endpoint.
pub const DEFAULT_BASE_URL: &str = "http://api.openweathermap.org/data/2.5/air_pollution";
/// Timeout for data requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout for the availability probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// A source of air quality readings.
///
/// Every successful call returns an envelope tagged
/// [`Source::OpenWeatherMap`]. Failures are reported, never retried.
#[async_trait]
pub trait AirQualityProvider: Send + Sync {
    /// Current conditions at a coordinate.
    async fn current(&self, lat: f64, lon: f64) -> Result<ReadingEnvelope>;

    /// Forecast for a coordinate.
    async fn forecast(&self, lat: f64, lon: f64) -> Result<ReadingEnvelope>;

    /// History for a coordinate between two Unix timestamps.
    async fn history(&self, lat: f64, lon: f64, start: i64, end: i64) -> Result<ReadingEnvelope>;

    /// Quick reachability check.
    async fn probe(&self) -> Result<()>;
}

/// Body returned by every upstream endpoint.
#[derive(Debug, Deserialize)]
struct UpstreamBody {
    coord: Coordinates,
    list: Vec<AirQualityEntry>,
}

/// HTTP client for the OpenWeatherMap air pollution API.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
    request_timeout: Duration,
    probe_timeout: Duration,
}

impl OpenWeatherClient {
    /// Create a client for the given endpoint.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The air pollution endpoint, e.g. [`DEFAULT_BASE_URL`]
    /// * `api_key` - The provider's `appid`
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| UpstreamError::Request {
                url: base_url.to_string(),
                source: e,
            })?;
        Self::with_client(base_url, api_key, client)
    }

    /// Create a client with a custom reqwest Client.
    pub fn with_client(base_url: &str, api_key: impl Into<String>, client: Client) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(UpstreamError::InvalidUrl(format!(
                "URL must start with http:// or https://, got: {}",
                base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        })
    }

    /// Override the data request and probe timeouts.
    pub fn timeouts(mut self, request: Duration, probe: Duration) -> Self {
        self.request_timeout = request;
        self.probe_timeout = probe;
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a GET request and check its status; the body is left unread.
    async fn send(
        &self,
        path: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> Result<(String, Response)> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| UpstreamError::Request {
                url: url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
            });
        }

        Ok((url, response))
    }

    async fn fetch(
        &self,
        path: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> Result<ReadingEnvelope> {
        let (url, response) = self.send(path, query, timeout).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::Request { url, source: e })?;
        let body: UpstreamBody = serde_json::from_slice(&bytes)?;

        Ok(ReadingEnvelope::new(body.coord, body.list, Source::OpenWeatherMap))
    }
}

fn coordinate_query(lat: f64, lon: f64) -> Vec<(&'static str, String)> {
    vec![("lat", lat.to_string()), ("lon", lon.to_string())]
}

#[async_trait]
impl AirQualityProvider for OpenWeatherClient {
    async fn current(&self, lat: f64, lon: f64) -> Result<ReadingEnvelope> {
        self.fetch("", &coordinate_query(lat, lon), self.request_timeout)
            .await
    }

    async fn forecast(&self, lat: f64, lon: f64) -> Result<ReadingEnvelope> {
        self.fetch("/forecast", &coordinate_query(lat, lon), self.request_timeout)
            .await
    }

    async fn history(&self, lat: f64, lon: f64, start: i64, end: i64) -> Result<ReadingEnvelope> {
        let mut query = coordinate_query(lat, lon);
        query.push(("start", start.to_string()));
        query.push(("end", end.to_string()));
        self.fetch("/history", &query, self.request_timeout).await
    }

    /// Any 2xx answer counts as available; the body is not decoded.
    async fn probe(&self) -> Result<()> {
        self.send(
            "",
            &coordinate_query(NEW_YORK.lat, NEW_YORK.lon),
            self.probe_timeout,
        )
        .await
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqi_types::AqiLevel;
    use mockito::Matcher;

    const BODY: &str = r#"{
        "coord": {"lon": -0.1278, "lat": 51.5074},
        "list": [
            {"dt": 1700000000, "main": {"aqi": 2},
             "components": {"co": 201.94, "no": 0.02, "no2": 0.77, "o3": 68.66,
                            "so2": 0.64, "pm2_5": 0.5, "pm10": 0.54, "nh3": 0.12}},
            {"dt": 1700003600, "main": {"aqi": 3},
             "components": {"co": 210.0, "pm2_5": 9.5}}
        ]
    }"#;

    fn client_for(server: &mockito::ServerGuard) -> OpenWeatherClient {
        OpenWeatherClient::new(&format!("{}/air_pollution", server.url()), "test-key").unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = OpenWeatherClient::new("http://localhost:8080/air_pollution/", "key").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/air_pollution");
        assert_eq!(client.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(client.probe_timeout, DEFAULT_PROBE_TIMEOUT);
    }

    #[test]
    fn test_client_rejects_bad_url() {
        let result = OpenWeatherClient::new("ftp://example.com", "key");
        assert!(matches!(result, Err(UpstreamError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_current_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/air_pollution")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("lat".into(), "51.5074".into()),
                Matcher::UrlEncoded("lon".into(), "-0.1278".into()),
                Matcher::UrlEncoded("appid".into(), "test-key".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(BODY)
            .create_async()
            .await;

        let envelope = client_for(&server).current(51.5074, -0.1278).await.unwrap();

        mock.assert_async().await;
        assert_eq!(envelope.source, Source::OpenWeatherMap);
        assert_eq!(envelope.coord.lat(), 51.5074);
        assert_eq!(envelope.len(), 2);
        assert_eq!(envelope.list[1].aqi(), AqiLevel::Moderate);
        assert_eq!(envelope.list[1].components.no2, None);
        assert_eq!(envelope.location_name, None);
    }

    #[tokio::test]
    async fn test_history_passes_range() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/air_pollution/history")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("start".into(), "100".into()),
                Matcher::UrlEncoded("end".into(), "200".into()),
            ]))
            .with_status(200)
            .with_body(BODY)
            .create_async()
            .await;

        let envelope = client_for(&server)
            .history(51.5074, -0.1278, 100, 200)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(envelope.len(), 2);
    }

    #[tokio::test]
    async fn test_forecast_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/air_pollution/forecast")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(BODY)
            .create_async()
            .await;

        let envelope = client_for(&server).forecast(1.0, 2.0).await.unwrap();

        mock.assert_async().await;
        assert_eq!(envelope.source, Source::OpenWeatherMap);
    }

    #[tokio::test]
    async fn test_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/air_pollution")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"cod": 401, "message": "Invalid API key"}"#)
            .create_async()
            .await;

        let result = client_for(&server).current(1.0, 2.0).await;
        assert!(matches!(result, Err(UpstreamError::Status { status: 401 })));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/air_pollution")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"list": [{"dt": 1, "main": {"aqi": 9}, "components": {}}]}"#)
            .create_async()
            .await;

        let result = client_for(&server).current(1.0, 2.0).await;
        assert!(matches!(result, Err(UpstreamError::Decode(_))));
    }

    #[tokio::test]
    async fn test_probe_uses_new_york() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/air_pollution")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("lat".into(), "40.7128".into()),
                Matcher::UrlEncoded("lon".into(), "-74.006".into()),
            ]))
            .with_status(200)
            .with_body(BODY)
            .create_async()
            .await;

        client_for(&server).probe().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_probe_ignores_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/air_pollution")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("not json at all")
            .create_async()
            .await;

        let client = client_for(&server);
        assert!(client.probe().await.is_ok());
        assert!(matches!(
            client.current(1.0, 2.0).await,
            Err(UpstreamError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_probe_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/air_pollution")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let result = client_for(&server).probe().await;
        assert!(matches!(result, Err(UpstreamError::Status { status: 503 })));
    }

    /// Accepts connections and never answers.
    async fn silent_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{}/air_pollution", addr)
    }

    fn is_timeout(result: &Result<impl std::fmt::Debug>) -> bool {
        matches!(result, Err(UpstreamError::Request { source, .. }) if source.is_timeout())
    }

    #[tokio::test]
    async fn test_probe_uses_probe_timeout() {
        let client = OpenWeatherClient::new(&silent_server().await, "key")
            .unwrap()
            .timeouts(Duration::from_secs(60), Duration::from_millis(200));

        let result = tokio::time::timeout(Duration::from_secs(10), client.probe())
            .await
            .expect("probe should give up on its own timeout");
        assert!(is_timeout(&result), "{:?}", result);
    }

    #[tokio::test]
    async fn test_data_calls_use_request_timeout() {
        let client = OpenWeatherClient::new(&silent_server().await, "key")
            .unwrap()
            .timeouts(Duration::from_millis(200), Duration::from_secs(60));

        let result = tokio::time::timeout(Duration::from_secs(10), client.current(1.0, 2.0))
            .await
            .expect("request should give up on its own timeout");
        assert!(is_timeout(&result), "{:?}", result);

        let result = tokio::time::timeout(Duration::from_secs(10), client.history(1.0, 2.0, 0, 1))
            .await
            .expect("request should give up on its own timeout");
        assert!(is_timeout(&result), "{:?}", result);
    }

    #[tokio::test]
    async fn test_unreachable() {
        // Nothing listens on port 1
        let client = OpenWeatherClient::new("http://127.0.0.1:1/air_pollution", "key")
            .unwrap()
            .timeouts(Duration::from_secs(2), Duration::from_secs(1));

        let result = client.probe().await;
        assert!(matches!(result, Err(UpstreamError::Request { .. })));
    }
}
