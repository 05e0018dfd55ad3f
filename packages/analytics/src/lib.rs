#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Time-window, moving-average, and hotspot aggregation.
//!
//! A [`TrendAggregator`] borrows a set of observations and the region
//! reference table, and answers each query with freshly computed rows. It
//! holds no state beyond those borrows, so independent queries can run in
//! parallel against the same data.

pub mod hotspots;
pub mod moving_average;
pub mod windows;

use chrono::{DateTime, Utc};
use risk_map_analytics_models::{RegionReference, RegionTable};
use risk_map_observation_models::Observation;
use thiserror::Error;

/// Errors that can occur during analytics operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyticsError {
    /// A moving average needs a window of at least one day.
    #[error("Moving average window must be at least 1 day")]
    EmptyWindow,

    /// Hotspot cells need a positive, finite size.
    #[error("Invalid hotspot cell size: {0}")]
    InvalidCellSize(f64),
}

/// Read-only aggregation over a borrowed observation set.
#[derive(Debug, Clone, Copy)]
pub struct TrendAggregator<'a> {
    observations: &'a [Observation],
    regions: &'a RegionTable,
}

impl<'a> TrendAggregator<'a> {
    /// Creates an aggregator over `observations` using `regions` for rates.
    #[must_use]
    pub const fn new(observations: &'a [Observation], regions: &'a RegionTable) -> Self {
        Self {
            observations,
            regions,
        }
    }

    /// Observations with `min <= timestamp <= max` (either bound optional).
    fn filtered(
        &self,
        min: Option<DateTime<Utc>>,
        max: Option<DateTime<Utc>>,
    ) -> impl Iterator<Item = &'a Observation> {
        self.observations.iter().filter(move |obs| {
            min.is_none_or(|min| obs.timestamp >= min) && max.is_none_or(|max| obs.timestamp <= max)
        })
    }

    fn region(&self, label: &str) -> Option<&RegionReference> {
        self.regions.get(label)
    }
}

/// Incidents per 100,000 residents, or 0 without population data.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rate_per_100k(count: u64, region: Option<&RegionReference>) -> f64 {
    match region {
        Some(r) if r.population > 0 => count as f64 * 100_000.0 / r.population as f64,
        _ => 0.0,
    }
}

/// Incidents per square mile, or 0 without area data.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rate_per_area(count: u64, region: Option<&RegionReference>) -> f64 {
    match region {
        Some(r) if r.area_sq_mi > 0.0 => count as f64 / r.area_sq_mi,
        _ => 0.0,
    }
}
