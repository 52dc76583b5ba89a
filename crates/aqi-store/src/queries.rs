//! Query builder for stored observations.
//!
//! [`ObservationQuery`] follows the builder pattern: the bounding box and
//! both time bounds are optional and can be chained in any order.
//!
//! # Example
//!
//! ```
//! use aqi_store::{ObservationQuery, Store};
//!
//! let store = Store::open_in_memory()?;
//!
//! // Everything within the default 0.1° box around Tokyo for one day
//! let query = ObservationQuery::new()
//!     .around(35.6762, 139.6503)
//!     .range(1_700_000_000, 1_700_086_400);
//!
//! let rows = store.try_query(&query)?;
//! assert!(rows.is_empty());
//! # Ok::<(), aqi_store::Error>(())
//! ```

/// Half-width in degrees of the bounding box used by range queries.
pub const BOX_TOLERANCE_DEG: f64 = 0.1;

/// Fluent query builder for observations.
///
/// By default, queries return results ordered by `timestamp` ascending
/// (oldest first), which is the order API callers receive history in.
#[derive(Debug, Clone, Default)]
pub struct ObservationQuery {
    /// Center of the ±[`BOX_TOLERANCE_DEG`] bounding box, as `(lat, lon)`.
    pub center: Option<(f64, f64)>,
    /// Include only rows at or after this Unix timestamp.
    pub since: Option<i64>,
    /// Include only rows at or before this Unix timestamp.
    pub until: Option<i64>,
}

impl ObservationQuery {
    /// Create a new query with default settings.
    ///
    /// Default behavior:
    /// - No bounding box (all coordinates)
    /// - No time range filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a bounding box around a coordinate.
    ///
    /// The box spans [`BOX_TOLERANCE_DEG`] on each side, inclusive.
    pub fn around(mut self, lat: f64, lon: f64) -> Self {
        self.center = Some((lat, lon));
        self
    }

    /// Filter to rows at or after this Unix timestamp.
    pub fn since(mut self, timestamp: i64) -> Self {
        self.since = Some(timestamp);
        self
    }

    /// Filter to rows at or before this Unix timestamp.
    pub fn until(mut self, timestamp: i64) -> Self {
        self.until = Some(timestamp);
        self
    }

    /// Filter to an inclusive `[start, end]` time range.
    pub fn range(self, start: i64, end: i64) -> Self {
        self.since(start).until(end)
    }

    /// Build the SQL WHERE clause and parameters.
    pub(crate) fn build_where(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some((lat, lon)) = self.center {
            conditions.push("latitude BETWEEN ? AND ?");
            params.push(Box::new(lat - BOX_TOLERANCE_DEG));
            params.push(Box::new(lat + BOX_TOLERANCE_DEG));
            conditions.push("longitude BETWEEN ? AND ?");
            params.push(Box::new(lon - BOX_TOLERANCE_DEG));
            params.push(Box::new(lon + BOX_TOLERANCE_DEG));
        }

        if let Some(since) = self.since {
            conditions.push("timestamp >= ?");
            params.push(Box::new(since));
        }

        if let Some(until) = self.until {
            conditions.push("timestamp <= ?");
            params.push(Box::new(until));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    /// Build the full SELECT statement.
    pub(crate) fn build_sql(&self) -> String {
        let (where_clause, _) = self.build_where();
        format!(
            "SELECT id, timestamp, latitude, longitude, aqi, pm2_5, pm10, co, no, no2, o3, \
             so2, nh3, location_name, source, created_at \
             FROM aqi_data {} ORDER BY timestamp ASC, id ASC",
            where_clause
        )
    }

    /// Build a COUNT statement over the same filters.
    pub(crate) fn build_count_sql(&self) -> String {
        let (where_clause, _) = self.build_where();
        format!("SELECT COUNT(*) FROM aqi_data {}", where_clause)
    }
}
