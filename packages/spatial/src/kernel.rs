//! Inverse-distance weight kernel.
//!
//! `w(i, j) = 1 / (d(i, j)^power + epsilon)` with `d` the planar Euclidean
//! distance in degrees. The epsilon keeps coincident points finite: they
//! dominate their row instead of dividing by zero. Rows are never
//! normalized here; call [`row_normalize`] or
//! [`WeightMatrix::row_normalized`] explicitly.

use chrono::{DateTime, Utc};
use risk_map_geography_models::LatLon;

/// Default additive stabilizer for the kernel denominator.
pub const DEFAULT_EPSILON: f64 = 1e-10;

/// Time-decay constant: weights fall by `1/e` per this many days of age.
pub const DECAY_DAYS: f64 = 365.0;

/// Inverse-distance kernel parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kernel {
    /// Distance exponent. 2 for risk scoring, 3-4 for sharp rendering.
    pub power: f64,
    /// Additive stabilizer in the denominator.
    pub epsilon: f64,
}

impl Default for Kernel {
    fn default() -> Self {
        Self::INVERSE_SQUARE
    }
}

impl Kernel {
    /// The inverse-square kernel used for risk scoring and the stats store.
    pub const INVERSE_SQUARE: Self = Self::new(2.0, DEFAULT_EPSILON);

    /// Creates a kernel with the given exponent and stabilizer.
    #[must_use]
    pub const fn new(power: f64, epsilon: f64) -> Self {
        Self { power, epsilon }
    }

    /// Creates a kernel with the given exponent and the default epsilon.
    #[must_use]
    pub const fn with_power(power: f64) -> Self {
        Self::new(power, DEFAULT_EPSILON)
    }

    /// Weight between two points.
    #[must_use]
    pub fn weight(&self, a: LatLon, b: LatLon) -> f64 {
        let d2 = a.distance_squared(&b);
        let dp = if (self.power - 2.0).abs() < f64::EPSILON {
            d2
        } else {
            d2.sqrt().powf(self.power)
        };
        1.0 / (dp + self.epsilon)
    }

    /// Weights from one query point to every reference point.
    #[must_use]
    pub fn row(&self, query: LatLon, reference: &[LatLon]) -> Vec<f64> {
        reference.iter().map(|r| self.weight(query, *r)).collect()
    }

    /// Full `query.len() × reference.len()` weight matrix.
    #[must_use]
    pub fn weights(&self, query: &[LatLon], reference: &[LatLon]) -> WeightMatrix {
        let mut data = Vec::with_capacity(query.len() * reference.len());
        for q in query {
            data.extend(reference.iter().map(|r| self.weight(*q, *r)));
        }
        WeightMatrix {
            rows: query.len(),
            cols: reference.len(),
            data,
        }
    }

    /// Weight matrix where each reference point's column is scaled by its
    /// age relative to `now` (see [`time_decay`]).
    #[must_use]
    pub fn decayed_weights(
        &self,
        query: &[LatLon],
        reference: &[(LatLon, DateTime<Utc>)],
        now: DateTime<Utc>,
    ) -> WeightMatrix {
        let decay: Vec<f64> = reference.iter().map(|(_, ts)| time_decay(*ts, now)).collect();
        let positions: Vec<LatLon> = reference.iter().map(|(p, _)| *p).collect();

        let mut matrix = self.weights(query, &positions);
        if matrix.cols > 0 {
            for row in matrix.data.chunks_mut(matrix.cols) {
                for (w, d) in row.iter_mut().zip(&decay) {
                    *w *= d;
                }
            }
        }
        matrix
    }
}

/// `exp(-age_days / 365)` where age is counted in whole days before `now`.
///
/// Observations dated after `now` get an age of zero rather than a boost.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn time_decay(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_days = (now - timestamp).num_days().max(0);
    (-(age_days as f64) / DECAY_DAYS).exp()
}

/// Scales a row in place so it sums to 1.
///
/// A row summing to zero (or to a non-finite value) is left untouched.
pub fn row_normalize(row: &mut [f64]) {
    let sum: f64 = row.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        for w in row.iter_mut() {
            *w /= sum;
        }
    }
}

/// Dense row-major weight matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl WeightMatrix {
    /// Number of query rows.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of reference columns.
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Weight at `(row, col)`, or `None` out of range.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            self.data.get(row * self.cols + col).copied()
        } else {
            None
        }
    }

    /// Iterates over rows as slices.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks(0) panics; a zero-column matrix has no data to chunk.
        self.data.chunks(self.cols.max(1))
    }

    /// Per-column sums (the total weight each reference point receives).
    #[must_use]
    pub fn column_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.cols];
        for row in self.iter_rows() {
            for (s, w) in sums.iter_mut().zip(row) {
                *s += w;
            }
        }
        sums
    }

    /// Per-row sums.
    #[must_use]
    pub fn row_sums(&self) -> Vec<f64> {
        if self.cols == 0 {
            return vec![0.0; self.rows];
        }
        self.iter_rows().map(|row| row.iter().sum()).collect()
    }

    /// Consumes the matrix, returning it with every row normalized.
    #[must_use]
    pub fn row_normalized(mut self) -> Self {
        if self.cols > 0 {
            for row in self.data.chunks_mut(self.cols) {
                row_normalize(row);
            }
        }
        self
    }

    /// Matrix-vector product: one weighted sum of `values` per row.
    ///
    /// `values` shorter than the column count contribute zeros for the
    /// missing entries.
    #[must_use]
    pub fn dot(&self, values: &[f64]) -> Vec<f64> {
        if self.cols == 0 {
            return vec![0.0; self.rows];
        }
        self.iter_rows()
            .map(|row| row.iter().zip(values).map(|(w, v)| w * v).sum())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    fn grid() -> Vec<LatLon> {
        vec![
            LatLon::new(0.0, 0.0),
            LatLon::new(0.0, 1.0),
            LatLon::new(1.0, 0.0),
            LatLon::new(1.0, 1.0),
        ]
    }

    #[test]
    fn inverse_square_weight() {
        let w = Kernel::INVERSE_SQUARE.weight(LatLon::new(0.0, 0.0), LatLon::new(3.0, 4.0));
        assert!((w - 1.0 / 25.0).abs() < 1e-9);
    }

    #[test]
    fn higher_power_matches_distance_exponent() {
        let w = Kernel::with_power(4.0).weight(LatLon::new(0.0, 0.0), LatLon::new(0.0, 2.0));
        assert!((w - 1.0 / 16.0).abs() < 1e-9);
    }

    #[test]
    fn coincident_points_are_finite_and_dominant() {
        let query = [LatLon::new(0.0, 0.0)];
        let matrix = Kernel::INVERSE_SQUARE.weights(&query, &grid());
        let w0 = matrix.get(0, 0).unwrap();
        assert!(w0.is_finite());
        assert!(w0 > 1e9);
        assert!(matrix.get(0, 1).unwrap() < 1.1);
    }

    #[test]
    fn normalized_rows_sum_to_one() {
        let query = [
            LatLon::new(0.3, 0.7),
            LatLon::new(0.0, 0.0),
            LatLon::new(-5.0, 12.0),
        ];
        let matrix = Kernel::with_power(3.0).weights(&query, &grid()).row_normalized();
        for sum in matrix.row_sums() {
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn empty_reference_yields_zero_rows() {
        let query = [LatLon::new(0.3, 0.7)];
        let matrix = Kernel::INVERSE_SQUARE.weights(&query, &[]).row_normalized();
        assert_eq!(matrix.rows(), 1);
        assert_eq!(matrix.cols(), 0);
        assert_eq!(matrix.dot(&[]), vec![0.0]);
    }

    #[test]
    fn row_normalize_leaves_zero_rows_alone() {
        let mut row = [0.0, 0.0];
        row_normalize(&mut row);
        assert_eq!(row, [0.0, 0.0]);
    }

    #[test]
    fn time_decay_uses_whole_days() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let fresh = Utc.with_ymd_and_hms(2025, 1, 1, 1, 0, 0).unwrap();
        let year_old = Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();
        assert!((time_decay(fresh, now) - 1.0).abs() < f64::EPSILON);
        assert!((time_decay(year_old, now) - (-1.0_f64).exp()).abs() < 1e-12);
        let future = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        assert!((time_decay(future, now) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn decayed_weights_scale_columns() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let old = now - chrono::Duration::days(365);
        let reference = [(LatLon::new(0.0, 1.0), now), (LatLon::new(0.0, 1.0), old)];
        let matrix =
            Kernel::INVERSE_SQUARE.decayed_weights(&[LatLon::new(0.0, 0.0)], &reference, now);
        let fresh = matrix.get(0, 0).unwrap();
        let stale = matrix.get(0, 1).unwrap();
        assert!((stale / fresh - (-1.0_f64).exp()).abs() < 1e-9);
    }

    #[test]
    fn column_sums_and_dot() {
        let query = [LatLon::new(0.0, 0.0), LatLon::new(1.0, 1.0)];
        let reference = [LatLon::new(0.0, 1.0)];
        let matrix = Kernel::INVERSE_SQUARE.weights(&query, &reference);
        let sums = matrix.column_sums();
        assert_eq!(sums.len(), 1);
        assert!((sums[0] - 2.0).abs() < 1e-9);
        let products = matrix.dot(&[3.0]);
        assert!((products[0] - 3.0).abs() < 1e-9);
    }
}
