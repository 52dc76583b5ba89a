//! Error types for data parsing in aqi-types.

use thiserror::Error;

/// Errors that can occur when converting raw values into typed readings.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// AQI category outside the 1..=5 scale.
    #[error("Invalid AQI category {0}: expected a value between 1 and 5")]
    InvalidAqi(u8),

    /// Unrecognised provenance tag.
    #[error("Unknown source tag: {0}")]
    UnknownSource(String),
}

/// Result type alias using aqi-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
