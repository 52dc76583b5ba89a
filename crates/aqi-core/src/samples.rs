//! Pre-generated sample readings used as the first fallback for current
//! conditions.
//!
//! The samples are written to a JSON file the first time the service
//! starts and loaded into memory on every start after that.

use std::path::Path;

use tracing::{info, warn};

use aqi_types::ReadingEnvelope;

use crate::error::SampleError;
use crate::synthetic::{self, Generator};

/// Radius in degrees within which a sample stands in for a coordinate.
pub const SAMPLE_RADIUS_DEG: f64 = 1.0;

/// In-memory table of sample envelopes.
#[derive(Debug, Clone, Default)]
pub struct SampleTable {
    samples: Vec<ReadingEnvelope>,
}

impl SampleTable {
    pub fn new(samples: Vec<ReadingEnvelope>) -> Self {
        Self { samples }
    }

    /// Generate a fresh set of samples ending at `now`.
    pub fn generate(now: i64) -> Self {
        Self::new(Generator::new().generate_samples(now))
    }

    /// Load the sample file, creating it first if it does not exist.
    ///
    /// Never fails: a file that cannot be read or parsed is replaced by
    /// freshly generated samples in memory, and a file that cannot be
    /// written only costs persistence across restarts.
    pub fn load_or_create(path: &Path) -> Self {
        if path.exists() {
            match Self::load(path) {
                Ok(table) => {
                    info!("Loaded {} samples from {}", table.len(), path.display());
                    return table;
                }
                Err(e) => {
                    warn!("{}; using freshly generated samples", e);
                    return Self::generate(synthetic::now());
                }
            }
        }

        let table = Self::generate(synthetic::now());
        match table.save(path) {
            Ok(()) => info!("Saved {} samples to {}", table.len(), path.display()),
            Err(e) => warn!("{}; keeping samples in memory only", e),
        }
        table
    }

    /// Read a sample file.
    pub fn load(path: &Path) -> Result<Self, SampleError> {
        let contents = std::fs::read_to_string(path).map_err(|e| SampleError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let samples = serde_json::from_str(&contents).map_err(|e| SampleError::Json {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self::new(samples))
    }

    /// Write the table as a JSON array, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), SampleError> {
        let io_error = |e: std::io::Error| SampleError::Io {
            path: path.to_path_buf(),
            source: e,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }

        let json = serde_json::to_string_pretty(&self.samples).map_err(|e| SampleError::Json {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(io_error)
    }

    /// The first sample within [`SAMPLE_RADIUS_DEG`] of the coordinate on
    /// both axes.
    pub fn find(&self, lat: f64, lon: f64) -> Option<&ReadingEnvelope> {
        self.samples.iter().find(|sample| {
            (sample.coord.lat() - lat).abs() < SAMPLE_RADIUS_DEG
                && (sample.coord.lon() - lon).abs() < SAMPLE_RADIUS_DEG
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
