#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Inverse-distance weighting, anchor mesh construction, and risk scoring.
//!
//! Everything here is pure and in-memory. The kernel turns two point sets
//! into a weight matrix, the mesh lays out the fixed anchor grid, the
//! scorer combines the two into a `[0, 1]` risk score for arbitrary
//! points, and the interpolator renders dense heatmap grids.
//!
//! Coordinates are planar degrees throughout.

pub mod interpolate;
pub mod kernel;
pub mod mesh;
pub mod normalize;
pub mod scorer;

pub use kernel::{DEFAULT_EPSILON, Kernel, WeightMatrix, row_normalize};
pub use mesh::{AnchorMesh, DEFAULT_BUFFER_FRACTION};
pub use scorer::{AnchorScoreSource, ScoredAnchor, SpatialScorer};

/// Errors that can occur while assembling spatial structures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpatialError {
    /// Anchor and score vectors have different lengths.
    #[error("expected {expected} anchor scores, got {actual}")]
    ScoreCountMismatch {
        /// Number of anchors.
        expected: usize,
        /// Number of scores supplied.
        actual: usize,
    },
}
