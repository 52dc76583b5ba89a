//! Startup backfill of the trailing historical window.
//!
//! Before the server accepts requests, each known location is checked for
//! roughly hourly coverage over the last `days` days. Locations below
//! [`COVERAGE_THRESHOLD`] of the expected point count are filled through
//! the historical acquisition path (upstream, else synthetic) and persisted
//! under the location's name.

use tracing::info;

use aqi_types::KNOWN_LOCATIONS;

use crate::acquisition::AcquisitionService;

/// Fraction of the expected hourly points below which a location is filled.
pub const COVERAGE_THRESHOLD: f64 = 0.8;

const DAY: i64 = 24 * 3600;

/// What the backfill did for one location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackfillOutcome {
    /// Coverage was low; `inserted` rows were written.
    Filled { inserted: usize },
    /// Coverage was sufficient with `existing` rows.
    Skipped { existing: u64 },
}

/// Per-location result of a backfill run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationReport {
    pub location: &'static str,
    pub outcome: BackfillOutcome,
}

/// Result of a backfill run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub locations: Vec<LocationReport>,
}

impl BackfillReport {
    /// Total rows written across all locations.
    pub fn total_inserted(&self) -> usize {
        self.locations
            .iter()
            .map(|report| match report.outcome {
                BackfillOutcome::Filled { inserted } => inserted,
                BackfillOutcome::Skipped { .. } => 0,
            })
            .sum()
    }

    /// Number of locations that were filled.
    pub fn filled(&self) -> usize {
        self.locations
            .iter()
            .filter(|report| matches!(report.outcome, BackfillOutcome::Filled { .. }))
            .count()
    }
}

/// Hourly points expected over `days` days.
pub fn expected_points(days: u32) -> u64 {
    24 * u64::from(days)
}

/// Whether `existing` rows fall short of the coverage threshold.
pub fn needs_backfill(existing: u64, days: u32) -> bool {
    (existing as f64) < expected_points(days) as f64 * COVERAGE_THRESHOLD
}

/// Fill every known location's trailing `days`-day window ending at `now`.
pub async fn run(service: &AcquisitionService, days: u32, now: i64) -> BackfillReport {
    let end = now;
    let start = end - i64::from(days) * DAY;
    let expected = expected_points(days);

    info!("Populating historical data for the last {} days", days);

    let mut report = BackfillReport::default();
    for location in KNOWN_LOCATIONS {
        let existing = service
            .count_stored(location.lat, location.lon, start, end)
            .await;

        let outcome = if needs_backfill(existing, days) {
            info!(
                "Populating historical data for {} (existing: {}, expected: ~{})",
                location.name, existing, expected
            );

            let envelope = service
                .historical(location.lat, location.lon, start, end)
                .await
                .with_location_name(location.name);
            let inserted = service.persist(&envelope, Some(location.name)).await;
            BackfillOutcome::Filled { inserted }
        } else {
            info!(
                "Sufficient historical data already exists for {} ({} points)",
                location.name, existing
            );
            BackfillOutcome::Skipped { existing }
        };

        report.locations.push(LocationReport {
            location: location.name,
            outcome,
        });
    }

    info!(
        "Backfill complete: {} location(s) filled, {} rows inserted",
        report.filled(),
        report.total_inserted()
    );

    report
}
