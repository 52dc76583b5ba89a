//! Shared types for the AQI service.
//!
//! This crate holds the data shapes every other crate in the workspace
//! exchanges: stored observations, the reading envelope returned by the
//! upstream provider and the HTTP API, provenance tags, and the fixed set
//! of known locations.
//!
//! # Example
//!
//! ```
//! use aqi_types::{resolve_location, AqiLevel, Source};
//!
//! assert_eq!(resolve_location(51.51, -0.13), Some("London"));
//! assert_eq!(Source::SyntheticFallback.as_str(), "Synthetic Fallback");
//! assert_eq!(AqiLevel::saturating_from(9), AqiLevel::VeryPoor);
//! ```

pub mod error;
pub mod locations;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use locations::{KNOWN_LOCATIONS, Location, NAME_TOLERANCE_DEG, resolve_location};
pub use types::{
    AirQualityEntry, AqiLevel, AqiMain, Coordinates, Observation, PollutantComponents,
    ReadingEnvelope, Source,
};
