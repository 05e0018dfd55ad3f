#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Persisted rolling 12-month statistics per anchor.
//!
//! The store keeps one row per (anchor, calendar month) for at most twelve
//! consecutive months. Each update overwrites the months its batch touches,
//! evicts months that fall out of the window, and renormalizes risk scores
//! per month. The table is written as CSV with a JSON metadata sidecar
//! describing the mesh it was built on.

mod index;
pub mod paths;
pub mod persist;
pub mod store;

use std::fmt;

use chrono::NaiveDate;
use risk_map_geography_models::BoundingBox;
use risk_map_spatial::AnchorMesh;

pub use store::RollingStatsStore;

/// Number of calendar months the store retains.
pub const WINDOW_MONTHS: u32 = 12;

/// Number of trailing months averaged into `recent_stats`.
pub const RECENT_MONTHS: usize = 3;

/// Errors that can occur during statistics store operations.
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization or deserialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Persisted data is unusable. [`RollingStatsStore::initialize`] treats
    /// this as recoverable and rebuilds an empty store.
    #[error("Store corruption: {0}")]
    Corruption(String),

    /// The persisted table was built on a different mesh than the one
    /// requested.
    #[error("Mesh mismatch: persisted store uses {persisted}, requested {requested}")]
    MeshMismatch {
        /// Mesh recorded in the metadata sidecar.
        persisted: MeshSpec,
        /// Mesh the caller asked for.
        requested: MeshSpec,
    },
}

/// The parameters that fully determine an anchor mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshSpec {
    /// Target bounds before buffering.
    pub bounds: BoundingBox,
    /// Anchors per side.
    pub resolution: u32,
    /// Buffer fraction.
    pub buffer_fraction: f64,
}

impl MeshSpec {
    /// Mesh spec with the default 5% buffer.
    #[must_use]
    pub const fn new(bounds: BoundingBox, resolution: u32) -> Self {
        Self {
            bounds,
            resolution,
            buffer_fraction: risk_map_spatial::DEFAULT_BUFFER_FRACTION,
        }
    }

    /// Builds the mesh this spec describes.
    #[must_use]
    pub fn build(&self) -> AnchorMesh {
        AnchorMesh::build_with_buffer(self.bounds, self.resolution, self.buffer_fraction)
    }

    /// Returns `true` when both specs describe the same mesh, allowing for
    /// float noise picked up by text serialization.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        const TOLERANCE: f64 = 1e-9;
        let close = |a: f64, b: f64| (a - b).abs() <= TOLERANCE;
        self.resolution == other.resolution
            && close(self.buffer_fraction, other.buffer_fraction)
            && close(self.bounds.west, other.bounds.west)
            && close(self.bounds.south, other.bounds.south)
            && close(self.bounds.east, other.bounds.east)
            && close(self.bounds.north, other.bounds.north)
    }
}

impl fmt::Display for MeshSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{r}x{r} over [{w}, {s}, {e}, {n}] with {b} buffer",
            r = self.resolution,
            w = self.bounds.west,
            s = self.bounds.south,
            e = self.bounds.east,
            n = self.bounds.north,
            b = self.buffer_fraction,
        )
    }
}

/// What an update did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Observations that contributed to a month in the window.
    pub applied: usize,
    /// Observations older than the window's lower bound.
    pub ignored: usize,
    /// Observations with non-finite coordinates or a non-finite or
    /// negative weight.
    pub rejected: usize,
    /// Months whose rows were overwritten, ascending.
    pub months_updated: Vec<NaiveDate>,
    /// Months dropped from the window.
    pub months_evicted: usize,
    /// Updated months whose normalization was skipped because every anchor
    /// had the same total.
    pub degenerate_months: usize,
}
