//! Database schema and migrations.

use rusqlite::{Connection, OptionalExtension};

use crate::error::{Error, Result};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Create the schema on a fresh database and record its version.
///
/// A database written by a newer schema is rejected rather than read.
pub fn initialize(conn: &Connection) -> Result<()> {
    match stored_version(conn)? {
        None => {
            create_schema_v1(conn)?;
            record_version(conn)
        }
        Some(version) if version > SCHEMA_VERSION => Err(Error::UnsupportedSchema(version)),
        Some(version) if version < SCHEMA_VERSION => record_version(conn),
        Some(_) => Ok(()),
    }
}

/// The recorded schema version, or `None` for a database never initialized.
fn stored_version(conn: &Connection) -> Result<Option<i32>> {
    let version = conn
        .query_row(
            "SELECT version FROM schema_version WHERE id = 1",
            [],
            |row| row.get(0),
        )
        .optional();

    match version {
        Ok(version) => Ok(version),
        // The tracking table itself is missing
        Err(rusqlite::Error::SqliteFailure(_, Some(msg))) if msg.contains("no such table") => {
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn record_version(conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?1)",
        [SCHEMA_VERSION],
    )?;
    Ok(())
}

/// Create the initial schema (version 1).
fn create_schema_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );

        -- Point-in-time observations; insert-only
        CREATE TABLE IF NOT EXISTS aqi_data (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp INTEGER NOT NULL,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            aqi INTEGER NOT NULL CHECK (aqi BETWEEN 1 AND 5),
            pm2_5 REAL,
            pm10 REAL,
            co REAL,
            no REAL,
            no2 REAL,
            o3 REAL,
            so2 REAL,
            nh3 REAL,
            location_name TEXT,
            source TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_timestamp_location
            ON aqi_data(timestamp, latitude, longitude);
        "#,
    )?;

    Ok(())
}
