//! Main store implementation.

use std::path::Path;

use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use time::OffsetDateTime;
use tracing::{debug, error, info};

use aqi_types::{AqiLevel, Observation, PollutantComponents, ReadingEnvelope, Source};

use crate::error::{Error, Result};
use crate::queries::ObservationQuery;
use crate::schema;

/// SQLite-based store for air quality observations.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        // WAL lets readers proceed while a batch insert is in flight
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self { conn })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }
}

// Write operations
impl Store {
    /// Insert one row per entry of the envelope, atomically.
    ///
    /// The coordinates come from the envelope in either of its forms. A
    /// `location_name` carried by the envelope takes precedence over the
    /// `location_name` argument. Returns the number of rows written.
    pub fn try_insert_envelope(
        &self,
        envelope: &ReadingEnvelope,
        location_name: Option<&str>,
    ) -> Result<usize> {
        let location_name = envelope.location_name.as_deref().or(location_name);
        let lat = envelope.coord.lat();
        let lon = envelope.coord.lon();
        let created_at = OffsetDateTime::now_utc().unix_timestamp();

        debug!(
            "Saving {} entries for ({}, {}) as {:?}",
            envelope.len(),
            lat,
            lon,
            location_name
        );

        let tx = self.conn.unchecked_transaction()?;
        let mut saved = 0;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO aqi_data (timestamp, latitude, longitude, aqi, pm2_5, pm10, co,
                 no, no2, o3, so2, nh3, location_name, source, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            )?;

            for entry in &envelope.list {
                let c = &entry.components;
                stmt.execute(rusqlite::params![
                    entry.dt,
                    lat,
                    lon,
                    entry.aqi().value(),
                    c.pm2_5,
                    c.pm10,
                    c.co,
                    c.no,
                    c.no2,
                    c.o3,
                    c.so2,
                    c.nh3,
                    location_name,
                    envelope.source.as_str(),
                    created_at,
                ])?;
                saved += 1;
            }
        }
        tx.commit()?;

        info!("Saved {} records to database", saved);
        Ok(saved)
    }

    /// Insert an envelope, logging and swallowing any storage failure.
    ///
    /// Returns the number of rows written, `0` on failure.
    pub fn insert_envelope(&self, envelope: &ReadingEnvelope, location_name: Option<&str>) -> usize {
        match self.try_insert_envelope(envelope, location_name) {
            Ok(saved) => saved,
            Err(e) => {
                error!("Database save error: {}", e);
                0
            }
        }
    }
}

// Read operations
impl Store {
    /// Query observations with filters.
    pub fn try_query(&self, query: &ObservationQuery) -> Result<Vec<Observation>> {
        let sql = query.build_sql();
        let (_, params) = query.build_where();

        debug!("Executing query: {}", sql);

        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let observations = stmt
            .query_map(params_ref.as_slice(), row_to_observation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(observations)
    }

    /// Count observations matching the filters.
    pub fn try_count(&self, query: &ObservationQuery) -> Result<u64> {
        let sql = query.build_count_sql();
        let (_, params) = query.build_where();
        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count: i64 = self
            .conn
            .query_row(&sql, params_ref.as_slice(), |row| row.get(0))?;

        Ok(count as u64)
    }

    /// Observations within the ±0.1° box around `(lat, lon)` with
    /// `start <= timestamp <= end`, oldest first.
    pub fn try_query_range(&self, lat: f64, lon: f64, start: i64, end: i64) -> Result<Vec<Observation>> {
        self.try_query(&ObservationQuery::new().around(lat, lon).range(start, end))
    }

    /// Like [`Store::try_query_range`], but a storage failure yields an empty result.
    pub fn query_range(&self, lat: f64, lon: f64, start: i64, end: i64) -> Vec<Observation> {
        match self.try_query_range(lat, lon, start, end) {
            Ok(rows) => rows,
            Err(e) => {
                error!("Database query error: {}", e);
                Vec::new()
            }
        }
    }

    /// Number of observations the matching range query would return; `0` on failure.
    pub fn count_range(&self, lat: f64, lon: f64, start: i64, end: i64) -> u64 {
        let query = ObservationQuery::new().around(lat, lon).range(start, end);
        match self.try_count(&query) {
            Ok(count) => count,
            Err(e) => {
                error!("Database count error: {}", e);
                0
            }
        }
    }

    /// Total number of stored observations.
    pub fn count_observations(&self) -> Result<u64> {
        self.try_count(&ObservationQuery::new())
    }
}

fn row_to_observation(row: &Row<'_>) -> rusqlite::Result<Observation> {
    let aqi: u8 = row.get(4)?;
    let aqi = AqiLevel::try_from(aqi)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Integer, Box::new(e)))?;

    let source: String = row.get(14)?;
    let source = source
        .parse::<Source>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(14, Type::Text, Box::new(e)))?;

    let created_at = OffsetDateTime::from_unix_timestamp(row.get(15)?)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(15, Type::Integer, Box::new(e)))?;

    Ok(Observation {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        latitude: row.get(2)?,
        longitude: row.get(3)?,
        aqi,
        components: PollutantComponents {
            pm2_5: row.get(5)?,
            pm10: row.get(6)?,
            co: row.get(7)?,
            no: row.get(8)?,
            no2: row.get(9)?,
            o3: row.get(10)?,
            so2: row.get(11)?,
            nh3: row.get(12)?,
        },
        location_name: row.get(13)?,
        source,
        created_at,
    })
}
