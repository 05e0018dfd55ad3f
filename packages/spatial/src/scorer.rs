//! Point risk scoring against a fixed set of scored anchors.
//!
//! A scorer holds one base score in `[0, 1]` per anchor. Scoring a point
//! weights every anchor by inverse-square distance, normalizes the weights
//! to sum to 1, and returns the weighted average of the base scores.

use chrono::{DateTime, Utc};
use risk_map_geography_models::{AnchorPoint, LatLon};
use risk_map_observation_models::Observation;

use crate::kernel::{Kernel, row_normalize};
use crate::mesh::AnchorMesh;
use crate::normalize::min_max;
use crate::SpatialError;

/// Anything that can hand over a scored anchor set, such as the persisted
/// rolling statistics store.
pub trait AnchorScoreSource {
    /// Anchors in id order.
    fn anchors(&self) -> &[AnchorPoint];

    /// Current base score per anchor, aligned with [`Self::anchors`].
    ///
    /// An empty vector means no scores exist yet.
    fn anchor_scores(&self) -> Vec<f64>;
}

/// An anchor paired with its base score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredAnchor {
    /// The anchor.
    pub anchor: AnchorPoint,
    /// Its base score.
    pub score: f64,
}

/// Scores arbitrary points from per-anchor base scores.
#[derive(Debug, Clone)]
pub struct SpatialScorer {
    anchors: Vec<AnchorPoint>,
    positions: Vec<LatLon>,
    base_scores: Vec<f64>,
    kernel: Kernel,
}

impl SpatialScorer {
    /// Builds a scorer from explicit anchor scores.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::ScoreCountMismatch`] if `scores` is not
    /// aligned with `anchors`.
    pub fn from_anchor_scores(
        anchors: Vec<AnchorPoint>,
        scores: Vec<f64>,
    ) -> Result<Self, SpatialError> {
        if anchors.len() != scores.len() {
            return Err(SpatialError::ScoreCountMismatch {
                expected: anchors.len(),
                actual: scores.len(),
            });
        }
        let positions = anchors.iter().map(AnchorPoint::position).collect();
        Ok(Self {
            anchors,
            positions,
            base_scores: scores,
            kernel: Kernel::INVERSE_SQUARE,
        })
    }

    /// Builds a scorer from a persisted source's most recent scores.
    ///
    /// A source with anchors but no scores yet yields an all-zero scorer.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::ScoreCountMismatch`] if the source's scores
    /// are not aligned with its anchors.
    pub fn from_store<S: AnchorScoreSource + ?Sized>(source: &S) -> Result<Self, SpatialError> {
        let anchors = source.anchors().to_vec();
        let mut scores = source.anchor_scores();
        if scores.is_empty() {
            scores = vec![0.0; anchors.len()];
        }
        Self::from_anchor_scores(anchors, scores)
    }

    /// Builds a scorer directly from observations.
    ///
    /// Each anchor's raw score is the sum of time-decayed inverse-square
    /// weights to every observation; raw scores are then min-max normalized
    /// across anchors. Zero observations, or identical raw scores
    /// everywhere, give all-zero base scores.
    #[must_use]
    pub fn from_observations(
        mesh: &AnchorMesh,
        observations: &[Observation],
        now: DateTime<Utc>,
    ) -> Self {
        let positions = mesh.positions();
        let reference: Vec<(LatLon, DateTime<Utc>)> = observations
            .iter()
            .map(|obs| (obs.position(), obs.timestamp))
            .collect();

        let raw: Vec<f64> = Kernel::INVERSE_SQUARE
            .decayed_weights(&positions, &reference, now)
            .row_sums();

        log::debug!(
            "Scored {} anchors from {} observations",
            positions.len(),
            observations.len()
        );

        Self {
            anchors: mesh.anchors().to_vec(),
            positions,
            base_scores: min_max(&raw),
            kernel: Kernel::INVERSE_SQUARE,
        }
    }

    /// Risk score in `[0, 1]` at `point`.
    ///
    /// A scorer without anchors scores everything 0.
    #[must_use]
    pub fn score(&self, point: LatLon) -> f64 {
        let mut weights = self.kernel.row(point, &self.positions);
        row_normalize(&mut weights);
        weights
            .iter()
            .zip(&self.base_scores)
            .map(|(w, s)| w * s)
            .sum::<f64>()
            .clamp(0.0, 1.0)
    }

    /// Scores many points; element `i` equals `score(points[i])`.
    #[must_use]
    pub fn score_batch(&self, points: &[LatLon]) -> Vec<f64> {
        points.iter().map(|p| self.score(*p)).collect()
    }

    /// Anchors whose base score is at least `threshold`, in id order.
    #[must_use]
    pub fn high_risk_areas(&self, threshold: f64) -> Vec<ScoredAnchor> {
        self.anchors
            .iter()
            .zip(&self.base_scores)
            .filter(|(_, score)| **score >= threshold)
            .map(|(anchor, score)| ScoredAnchor {
                anchor: *anchor,
                score: *score,
            })
            .collect()
    }

    /// Anchors backing this scorer.
    #[must_use]
    pub fn anchors(&self) -> &[AnchorPoint] {
        &self.anchors
    }

    /// Base score per anchor.
    #[must_use]
    pub fn base_scores(&self) -> &[f64] {
        &self.base_scores
    }
}
