//! Core types for air quality data.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::ParseError;

/// Air quality index category on the 1 (good) to 5 (very poor) scale.
///
/// The category can only be constructed from values in `1..=5`, so an
/// upstream body or stored row carrying anything else fails to parse.
///
/// # Ordering
///
/// Levels are ordered by severity, which allows threshold checks like
/// `if level >= AqiLevel::Poor { ... }`.
///
/// ```
/// use aqi_types::AqiLevel;
///
/// assert_eq!(AqiLevel::try_from(3), Ok(AqiLevel::Moderate));
/// assert!(AqiLevel::try_from(6).is_err());
/// assert!(AqiLevel::VeryPoor > AqiLevel::Fair);
/// assert_eq!(format!("{}", AqiLevel::Good), "Good");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum AqiLevel {
    Good = 1,
    Fair = 2,
    Moderate = 3,
    Poor = 4,
    VeryPoor = 5,
}

impl AqiLevel {
    /// Convert any integer to a level, clamping it into `1..=5`.
    #[must_use]
    pub fn saturating_from(value: i64) -> Self {
        match value {
            i64::MIN..=1 => AqiLevel::Good,
            2 => AqiLevel::Fair,
            3 => AqiLevel::Moderate,
            4 => AqiLevel::Poor,
            _ => AqiLevel::VeryPoor,
        }
    }

    /// Numeric value of the category.
    #[must_use]
    pub fn value(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for AqiLevel {
    type Error = ParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AqiLevel::Good),
            2 => Ok(AqiLevel::Fair),
            3 => Ok(AqiLevel::Moderate),
            4 => Ok(AqiLevel::Poor),
            5 => Ok(AqiLevel::VeryPoor),
            other => Err(ParseError::InvalidAqi(other)),
        }
    }
}

impl From<AqiLevel> for u8 {
    fn from(level: AqiLevel) -> Self {
        level as u8
    }
}

impl fmt::Display for AqiLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AqiLevel::Good => write!(f, "Good"),
            AqiLevel::Fair => write!(f, "Fair"),
            AqiLevel::Moderate => write!(f, "Moderate"),
            AqiLevel::Poor => write!(f, "Poor"),
            AqiLevel::VeryPoor => write!(f, "Very Poor"),
        }
    }
}

/// Provenance of a set of readings.
///
/// Serialized with the human-readable labels clients already rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// Fetched from the upstream pollution provider.
    #[serde(rename = "OpenWeatherMap API")]
    OpenWeatherMap,
    /// Generated locally because the provider was unavailable.
    #[serde(rename = "Synthetic Fallback")]
    SyntheticFallback,
    /// Read back from the local observation store.
    #[serde(rename = "Local Database")]
    LocalDatabase,
}

impl Source {
    /// The label used on the wire and in the database.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::OpenWeatherMap => "OpenWeatherMap API",
            Source::SyntheticFallback => "Synthetic Fallback",
            Source::LocalDatabase => "Local Database",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OpenWeatherMap API" => Ok(Source::OpenWeatherMap),
            "Synthetic Fallback" => Ok(Source::SyntheticFallback),
            "Local Database" => Ok(Source::LocalDatabase),
            other => Err(ParseError::UnknownSource(other.to_string())),
        }
    }
}

/// Pollutant concentrations in μg/m³.
///
/// Every component is optional: the provider may omit any of them and the
/// store keeps missing values as NULL rather than zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollutantComponents {
    /// Carbon monoxide.
    pub co: Option<f64>,
    /// Nitrogen monoxide.
    pub no: Option<f64>,
    /// Nitrogen dioxide.
    pub no2: Option<f64>,
    /// Ozone.
    pub o3: Option<f64>,
    /// Sulphur dioxide.
    pub so2: Option<f64>,
    /// Fine particulate matter (< 2.5 μm).
    pub pm2_5: Option<f64>,
    /// Coarse particulate matter (< 10 μm).
    pub pm10: Option<f64>,
    /// Ammonia.
    pub nh3: Option<f64>,
}

/// The `main` object of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AqiMain {
    pub aqi: AqiLevel,
}

/// One timestamped element of a reading envelope's `list`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AirQualityEntry {
    /// Unix timestamp in seconds.
    pub dt: i64,
    pub main: AqiMain,
    pub components: PollutantComponents,
}

impl AirQualityEntry {
    /// Create an entry from its parts.
    pub fn new(dt: i64, aqi: AqiLevel, components: PollutantComponents) -> Self {
        Self {
            dt,
            main: AqiMain { aqi },
            components,
        }
    }

    /// The AQI category of this entry.
    pub fn aqi(&self) -> AqiLevel {
        self.main.aqi
    }
}

/// Coordinates of an envelope.
///
/// The provider returns a `{"lat": .., "lon": ..}` object while generated
/// and stored envelopes use a `[lat, lon]` pair. Both forms deserialize.
///
/// ```
/// use aqi_types::Coordinates;
///
/// let object: Coordinates = serde_json::from_str(r#"{"lon": 116.4, "lat": 39.9}"#).unwrap();
/// let pair: Coordinates = serde_json::from_str("[39.9, 116.4]").unwrap();
/// assert_eq!(object.lat(), pair.lat());
/// assert_eq!(object.lon(), pair.lon());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coordinates {
    Point { lat: f64, lon: f64 },
    Pair(f64, f64),
}

impl Coordinates {
    /// Build the `[lat, lon]` form.
    pub fn pair(lat: f64, lon: f64) -> Self {
        Coordinates::Pair(lat, lon)
    }

    /// Latitude in degrees.
    pub fn lat(&self) -> f64 {
        match *self {
            Coordinates::Point { lat, .. } | Coordinates::Pair(lat, _) => lat,
        }
    }

    /// Longitude in degrees.
    pub fn lon(&self) -> f64 {
        match *self {
            Coordinates::Point { lon, .. } | Coordinates::Pair(_, lon) => lon,
        }
    }
}

/// Coordinates, a list of readings and their provenance.
///
/// This is the shape exchanged with the provider and returned to API
/// callers. The element type defaults to [`AirQualityEntry`]; envelopes
/// served from the store carry [`Observation`] rows instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingEnvelope<T = AirQualityEntry> {
    pub coord: Coordinates,
    pub list: Vec<T>,
    pub source: Source,
    /// Display name of a known location, when one applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
}

impl<T> ReadingEnvelope<T> {
    /// Create an envelope without a location name.
    pub fn new(coord: Coordinates, list: Vec<T>, source: Source) -> Self {
        Self {
            coord,
            list,
            source,
            location_name: None,
        }
    }

    /// Attach a location name.
    pub fn with_location_name(mut self, name: impl Into<String>) -> Self {
        self.location_name = Some(name.into());
        self
    }

    /// Number of readings in the envelope.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Whether the envelope carries no readings.
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

/// One stored reading at one place and time.
///
/// Serializes flat, with the pollutant columns next to the row metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Database row ID.
    pub id: i64,
    /// Unix timestamp of the reading in seconds.
    pub timestamp: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub aqi: AqiLevel,
    #[serde(flatten)]
    pub components: PollutantComponents,
    pub location_name: Option<String>,
    pub source: Source,
    /// When the row was written.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
