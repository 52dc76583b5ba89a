//! HTTP API for air quality data with upstream fallback and local caching.
//!
//! This crate provides a service that:
//! - Proxies the OpenWeatherMap air pollution API
//! - Falls back to synthetic data whenever the provider is unavailable
//! - Caches every reading it serves in a local SQLite database
//! - Backfills a trailing historical window for the known locations at startup
//!
//! # REST API Endpoints
//!
//! - `GET /api/current?lat&lon` - Current conditions (persisted)
//! - `GET /api/forecast?lat&lon` - Forecast (not persisted)
//! - `GET /api/historical?lat&lon&start&end` - History, served from the store when present
//! - `GET /api/health` - Service health and upstream availability
//!
//! Every endpoint requires an `X-API-Key` header matching the configured secret.
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/aqi/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:5000"
//!
//! [storage]
//! path = "~/.local/share/aqi/aqi_data.db"
//!
//! [upstream]
//! api_key = "your-openweathermap-key"
//!
//! [security]
//! api_key = "shared-secret"
//!
//! [history]
//! days = 30
//! max_range_days = 365
//! ```
//!
//! `OPENWEATHER_API_KEY`, `API_SECRET_KEY`, `AQI_HISTORICAL_DAYS`, `AQI_BIND`
//! and `AQI_DATABASE` override the file, and may be set in a `.env` file.

pub mod api;
pub mod config;
pub mod middleware;
pub mod state;

pub use config::{
    Config, ConfigError, HistoryConfig, SecurityConfig, ServerConfig, StorageConfig,
    UpstreamConfig, ValidationError,
};
pub use state::AppState;
