//! REST API endpoints for the AQI service.
//!
//! Every endpoint sits behind [`api_key_auth`]. Handlers never surface
//! upstream or storage failures: acquisition falls back to synthetic data
//! and the store degrades to empty results, so the only error responses
//! are 400 for bad parameters and 401 for a bad key.
//!
//! # Example
//!
//! ```ignore
//! use aqi_service::api;
//!
//! let app = api::app(state);
//! ```

use std::path::Path;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use aqi_core::ApiStatus;
use aqi_types::{Coordinates, ReadingEnvelope, Source};

use crate::middleware::api_key_auth;
use crate::state::AppState;

/// Create the API router without authentication.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/current", get(current))
        .route("/api/forecast", get(forecast))
        .route("/api/historical", get(historical))
        .route("/api/health", get(health))
}

/// The full application: every route behind API key authentication.
pub fn app(state: Arc<AppState>) -> Router {
    let security = Arc::new(state.config.security.clone());
    router()
        .route_layer(from_fn_with_state(security, api_key_auth))
        .with_state(state)
}

/// Query parameters for current conditions and forecasts.
///
/// Values are taken as strings so a bad value yields a JSON error body.
#[derive(Debug, Deserialize, Default)]
pub struct CoordinateQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
}

/// Query parameters for history.
#[derive(Debug, Deserialize, Default)]
pub struct HistoricalQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Current conditions; the result is persisted.
async fn current(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CoordinateQuery>,
) -> Result<Json<ReadingEnvelope>, ApiError> {
    let (lat, lon) = require_coordinates(&query, "Location required (lat/lon)")?;

    let envelope = state.acquisition.current(lat, lon).await;
    state.acquisition.persist(&envelope, None).await;

    Ok(Json(envelope))
}

/// Forecast; never persisted.
async fn forecast(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CoordinateQuery>,
) -> Result<Json<ReadingEnvelope>, ApiError> {
    let (lat, lon) = require_coordinates(&query, "Coordinates required")?;

    Ok(Json(state.acquisition.forecast(lat, lon).await))
}

/// History for an inclusive date range.
///
/// Stored rows are served as a `"Local Database"` envelope when any exist.
/// Otherwise the range is acquired (upstream, else synthetic), persisted,
/// and returned.
async fn historical(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoricalQuery>,
) -> Result<Response, ApiError> {
    let (Some(lat), Some(lon), Some(start), Some(end)) =
        (&query.lat, &query.lon, &query.start, &query.end)
    else {
        return Err(ApiError::BadRequest(
            "lat, lon, start, and end parameters required".to_string(),
        ));
    };

    let (lat, lon) = parse_coordinates(lat, lon)?;
    let start = parse_date("start", start)?;
    let end = parse_date("end", end)?;
    if start > end {
        return Err(ApiError::BadRequest(format!(
            "Invalid time range: 'start' ({}) must not be after 'end' ({})",
            start, end
        )));
    }
    let max_range = state.config.history.max_range_secs();
    if end - start > max_range {
        return Err(ApiError::BadRequest(format!(
            "Invalid time range: at most {} days may be requested at once",
            state.config.history.max_range_days
        )));
    }

    let rows = state
        .acquisition
        .historical_from_store(lat, lon, start, end)
        .await;
    if !rows.is_empty() {
        let envelope = ReadingEnvelope::new(Coordinates::pair(lat, lon), rows, Source::LocalDatabase);
        return Ok(Json(envelope).into_response());
    }

    let envelope = state.acquisition.historical(lat, lon, start, end).await;
    state.acquisition.persist(&envelope, None).await;

    Ok(Json(envelope).into_response())
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Unix timestamp in seconds.
    pub timestamp: i64,
    pub openweather_api_status: ApiStatus,
    pub historical_days: u32,
    /// Database file path.
    pub database: String,
    /// Directory holding the database.
    pub data_directory: String,
}

/// Health check endpoint.
///
/// Always reports healthy; the upstream status is informational.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let api_status = state.acquisition.check_availability().await;
    let db_path = &state.config.storage.path;
    let data_directory = db_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    Json(HealthResponse {
        status: "healthy",
        timestamp: OffsetDateTime::now_utc().unix_timestamp(),
        openweather_api_status: api_status,
        historical_days: state.config.history.days,
        database: db_path.display().to_string(),
        data_directory: data_directory.display().to_string(),
    })
}

fn require_coordinates(query: &CoordinateQuery, missing: &str) -> Result<(f64, f64), ApiError> {
    match (&query.lat, &query.lon) {
        (Some(lat), Some(lon)) => parse_coordinates(lat, lon),
        _ => Err(ApiError::BadRequest(missing.to_string())),
    }
}

/// Parse and range-check a latitude/longitude pair.
fn parse_coordinates(lat: &str, lon: &str) -> Result<(f64, f64), ApiError> {
    let lat = parse_number("lat", lat)?;
    let lon = parse_number("lon", lon)?;

    if !(-90.0..=90.0).contains(&lat) {
        return Err(ApiError::BadRequest(format!(
            "Invalid lat: {} is outside -90 to 90",
            lat
        )));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(ApiError::BadRequest(format!(
            "Invalid lon: {} is outside -180 to 180",
            lon
        )));
    }

    Ok((lat, lon))
}

fn parse_number(name: &str, value: &str) -> Result<f64, ApiError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid {}: '{}' is not a number", name, value)))
}

fn parse_date(name: &str, value: &str) -> Result<i64, ApiError> {
    parse_timestamp(value).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Invalid {} date: '{}' (expected YYYY-MM-DD or YYYY-MM-DDTHH:MM[:SS])",
            name, value
        ))
    })
}

/// Parse an ISO 8601 date or date-time into a Unix timestamp.
///
/// Accepts RFC 3339 with an offset, or a date and optional time without
/// one, which is read as UTC.
pub fn parse_timestamp(value: &str) -> Option<i64> {
    let value = value.trim();

    if let Ok(datetime) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(datetime.unix_timestamp());
    }

    let naive_formats = [
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]"),
    ];
    for format in naive_formats {
        if let Ok(datetime) = PrimitiveDateTime::parse(value, format) {
            return Some(datetime.assume_utc().unix_timestamp());
        }
    }

    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc().unix_timestamp())
}

/// API error type.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed request parameters.
    BadRequest(String),
    /// Missing or wrong API key.
    Unauthorized,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "API key is missing or invalid".to_string(),
            ),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}
