//! The fixed reference locations and coordinate-to-name resolution.

use crate::types::Coordinates;

/// Tolerance in degrees for naming a coordinate after a known location.
pub const NAME_TOLERANCE_DEG: f64 = 0.1;

/// A named reference point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lon: f64) -> Self {
        Self { name, lat, lon }
    }

    /// Whether both coordinate deltas are strictly below `tolerance` degrees.
    pub fn is_near(&self, lat: f64, lon: f64, tolerance: f64) -> bool {
        (lat - self.lat).abs() < tolerance && (lon - self.lon).abs() < tolerance
    }

    /// The location as a `[lat, lon]` coordinate pair.
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::pair(self.lat, self.lon)
    }
}

pub const NEW_YORK: Location = Location::new("New York", 40.7128, -74.0060);
pub const LONDON: Location = Location::new("London", 51.5074, -0.1278);
pub const TOKYO: Location = Location::new("Tokyo", 35.6762, 139.6503);
pub const BEIJING: Location = Location::new("Beijing", 39.9042, 116.4074);
pub const SHANGHAI: Location = Location::new("Shanghai", 31.2304, 121.4737);

/// Every location the service knows by name, in lookup order.
pub const KNOWN_LOCATIONS: [Location; 5] = [NEW_YORK, LONDON, TOKYO, BEIJING, SHANGHAI];

/// Resolve a coordinate to the name of a known location.
///
/// The first location within [`NAME_TOLERANCE_DEG`] on both axes wins.
///
/// ```
/// use aqi_types::resolve_location;
///
/// assert_eq!(resolve_location(39.95, 116.40), Some("Beijing"));
/// assert_eq!(resolve_location(39.95, 118.0), None);
/// ```
pub fn resolve_location(lat: f64, lon: f64) -> Option<&'static str> {
    KNOWN_LOCATIONS
        .iter()
        .find(|location| location.is_near(lat, lon, NAME_TOLERANCE_DEG))
        .map(|location| location.name)
}
