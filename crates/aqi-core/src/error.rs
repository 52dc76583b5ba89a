//! Error types for aqi-core.
//!
//! None of these errors reach an API caller: every upstream failure is
//! recovered by a synthetic fallback, and sample file failures fall back
//! to samples generated in memory. They exist so the recovery paths can
//! log what went wrong.

use std::path::PathBuf;

use thiserror::Error;

/// Failure talking to the upstream pollution provider.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The request could not be sent, or timed out.
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The provider answered with a non-success status.
    #[error("Upstream returned HTTP {status}")]
    Status { status: u16 },

    /// The body was not a reading envelope.
    #[error("Malformed upstream body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured base URL is unusable.
    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(String),

    /// The provider is unavailable for another reason.
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),
}

/// Result type for upstream operations.
pub type Result<T> = std::result::Result<T, UpstreamError>;

/// Failure reading or writing the sample file.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("Failed to access sample file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed sample file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
