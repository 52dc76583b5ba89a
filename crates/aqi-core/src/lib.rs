//! Data acquisition pipeline for the AQI service.
//!
//! For each request this crate decides whether readings come from the
//! upstream OpenWeatherMap air pollution API, the local observation store,
//! or the synthetic generator, and it keeps the store populated with a
//! rolling historical window.
//!
//! # Components
//!
//! | Module | Role |
//! |--------|------|
//! | [`upstream`] | [`AirQualityProvider`] trait and the reqwest-based [`OpenWeatherClient`] |
//! | [`synthetic`] | Plausible fallback readings |
//! | [`samples`] | Pre-generated samples preferred over fresh synthesis |
//! | [`acquisition`] | [`AcquisitionService`], the per-request decision logic |
//! | [`backfill`] | Startup fill of the trailing window |
//! | [`mock`] | [`MockProvider`] for tests |
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use aqi_core::{AcquisitionService, MockProvider, SampleTable};
//! use aqi_store::Store;
//! use aqi_types::Source;
//! use tokio::sync::Mutex;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(Mutex::new(Store::open_in_memory()?));
//!     let service = AcquisitionService::new(
//!         Arc::new(MockProvider::failing()),
//!         store,
//!         SampleTable::default(),
//!     );
//!
//!     let envelope = service.current(39.9042, 116.4074).await;
//!     assert_eq!(envelope.source, Source::SyntheticFallback);
//!     assert_eq!(envelope.location_name.as_deref(), Some("Beijing"));
//!     Ok(())
//! }
//! ```

pub mod acquisition;
pub mod backfill;
pub mod error;
pub mod mock;
pub mod samples;
pub mod synthetic;
pub mod upstream;

pub use acquisition::{AcquisitionService, ApiStatus};
pub use backfill::{BackfillOutcome, BackfillReport, LocationReport};
pub use error::{Result, SampleError, UpstreamError};
pub use mock::MockProvider;
pub use samples::SampleTable;
pub use synthetic::Generator;
pub use upstream::{AirQualityProvider, OpenWeatherClient};
