//! Error types for aqi-store.

use std::path::PathBuf;

/// Result type for aqi-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in aqi-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The database was written by a newer schema.
    #[error("Unsupported schema version {0}")]
    UnsupportedSchema(i32),
}
