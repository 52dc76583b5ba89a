//! Local persistence for air quality observations.
//!
//! This crate provides SQLite-based storage for observations fetched from
//! the upstream provider or synthesized as a fallback. Rows are only ever
//! inserted; reads are bounding-box and time-range queries.
//!
//! # Error boundary
//!
//! The `try_*` methods return [`Result`]. Their plain counterparts
//! ([`Store::insert_envelope`], [`Store::query_range`], [`Store::count_range`])
//! log storage failures and degrade to zero rows written or an empty result,
//! so callers never have to handle a database error.
//!
//! # Example
//!
//! ```no_run
//! use aqi_store::Store;
//!
//! let store = Store::open_default()?;
//! let rows = store.query_range(39.9042, 116.4074, 1_700_000_000, 1_700_086_400);
//! println!("{} observations", rows.len());
//! # Ok::<(), aqi_store::Error>(())
//! ```

mod error;
mod queries;
mod schema;
mod store;

pub use error::{Error, Result};
pub use queries::{BOX_TOLERANCE_DEG, ObservationQuery};
pub use store::Store;

/// Default data directory following platform conventions.
///
/// - Linux: `~/.local/share/aqi`
/// - macOS: `~/Library/Application Support/aqi`
/// - Windows: `C:\Users\<user>\AppData\Local\aqi`
pub fn default_data_dir() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("aqi")
}

/// Default database path inside [`default_data_dir`].
pub fn default_db_path() -> std::path::PathBuf {
    default_data_dir().join("aqi_data.db")
}
