//! Dense-grid IDW interpolation for heatmap rendering.
//!
//! Samples are scattered weighted points (a traffic counter's AADT, or the
//! number of incidents reported at one address). The grid spans the sample
//! extent plus a buffer; each cell takes the row-normalized IDW average of
//! every sample value, and a [`ColorScale`] maps those values to `[0, 1]`.

use std::collections::BTreeMap;

use risk_map_geography_models::{BoundingBox, GridCell, LatLon};
use risk_map_observation_models::Observation;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::kernel::Kernel;
use crate::mesh::{AnchorMesh, DEFAULT_BUFFER_FRACTION};
use crate::normalize::{double_log, min_max, percentile_rank};

/// One weighted input point.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedSample {
    /// Sample position.
    pub position: LatLon,
    /// Magnitude at this position.
    pub value: f64,
    /// Optional descriptive label (road name, category).
    pub label: Option<String>,
}

impl WeightedSample {
    /// Creates an unlabeled sample.
    #[must_use]
    pub const fn new(position: LatLon, value: f64) -> Self {
        Self {
            position,
            value,
            label: None,
        }
    }

    /// Sample valued by the observation's weight hint, labeled by its
    /// category column. Returns `None` when there is no weight hint.
    #[must_use]
    pub fn from_weighted_observation(obs: &Observation) -> Option<Self> {
        obs.weight_hint.map(|value| Self {
            position: obs.position(),
            value,
            label: obs.category.clone(),
        })
    }
}

/// How interpolated values map to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum ColorScale {
    /// Linear min-max.
    #[default]
    MinMax,
    /// `log1p`, min-max, `log1p(x * 100)`, min-max.
    DoubleLog,
    /// Average-rank percentile.
    PercentileRank,
}

impl ColorScale {
    /// Applies this scale to a set of values.
    #[must_use]
    pub fn apply(self, values: &[f64]) -> Vec<f64> {
        match self {
            Self::MinMax => min_max(values),
            Self::DoubleLog => double_log(values),
            Self::PercentileRank => percentile_rank(values),
        }
    }
}

/// Grid rendering parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridConfig {
    /// Cells per side.
    pub resolution: u32,
    /// IDW distance exponent.
    pub power: f64,
    /// Fraction of the sample extent added on each side.
    pub buffer_fraction: f64,
    /// Value-to-color mapping.
    pub scale: ColorScale,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self::traffic()
    }
}

impl GridConfig {
    /// Smooth 100×100 traffic surface: power 2, 5% buffer, double-log.
    #[must_use]
    pub const fn traffic() -> Self {
        Self {
            resolution: 100,
            power: 2.0,
            buffer_fraction: DEFAULT_BUFFER_FRACTION,
            scale: ColorScale::DoubleLog,
        }
    }

    /// Sharp 50×50 incident-density surface: power 4, no buffer,
    /// percentile rank.
    #[must_use]
    pub const fn density() -> Self {
        Self {
            resolution: 50,
            power: 4.0,
            buffer_fraction: 0.0,
            scale: ColorScale::PercentileRank,
        }
    }
}

/// Interpolates `samples` onto a `resolution × resolution` grid.
///
/// Cells are generated in the same row-major order as [`AnchorMesh`].
/// No samples gives an empty grid.
#[must_use]
pub fn interpolate_grid(samples: &[WeightedSample], config: &GridConfig) -> Vec<GridCell> {
    let Some(bounds) = BoundingBox::from_points(samples.iter().map(|s| s.position)) else {
        return Vec::new();
    };

    let mesh = AnchorMesh::build_with_buffer(bounds, config.resolution, config.buffer_fraction);
    let cells = mesh.positions();
    let positions: Vec<LatLon> = samples.iter().map(|s| s.position).collect();
    let values: Vec<f64> = samples.iter().map(|s| s.value).collect();

    let interpolated = Kernel::with_power(config.power)
        .weights(&cells, &positions)
        .row_normalized()
        .dot(&values);
    let normalized = config.scale.apply(&interpolated);

    log::debug!(
        "Interpolated {} samples onto {} cells ({} scale)",
        samples.len(),
        cells.len(),
        config.scale
    );

    cells
        .iter()
        .zip(interpolated.iter().zip(&normalized))
        .map(|(cell, (value, normalized_value))| GridCell {
            latitude: cell.latitude,
            longitude: cell.longitude,
            value: *value,
            normalized_value: *normalized_value,
        })
        .collect()
}

/// Collapses observations sharing exact coordinates into one sample whose
/// value is the number of observations there.
///
/// Output is ordered by latitude, then longitude.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn density_samples(observations: &[Observation]) -> Vec<WeightedSample> {
    let mut counts: BTreeMap<(OrderedCoord, OrderedCoord), usize> = BTreeMap::new();
    for obs in observations {
        *counts
            .entry((OrderedCoord(obs.latitude), OrderedCoord(obs.longitude)))
            .or_default() += 1;
    }
    counts
        .into_iter()
        .map(|((lat, lon), count)| WeightedSample::new(LatLon::new(lat.0, lon.0), count as f64))
        .collect()
}

/// Aggregate of the samples near a point.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbySummary {
    /// Mean sample value.
    pub average_value: f64,
    /// Largest sample value.
    pub max_value: f64,
    /// Distinct labels, sorted.
    pub labels: Vec<String>,
    /// Samples within the radius.
    pub point_count: usize,
}

/// Summarizes samples within `radius_degrees` (inclusive) of `center`.
///
/// Returns `None` when nothing is in range.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn nearby_summary(
    samples: &[WeightedSample],
    center: LatLon,
    radius_degrees: f64,
) -> Option<NearbySummary> {
    let nearby: Vec<&WeightedSample> = samples
        .iter()
        .filter(|s| s.position.distance(&center) <= radius_degrees)
        .collect();
    if nearby.is_empty() {
        return None;
    }

    let total: f64 = nearby.iter().map(|s| s.value).sum();
    let max_value = nearby
        .iter()
        .map(|s| s.value)
        .fold(f64::NEG_INFINITY, f64::max);
    let mut labels: Vec<String> = nearby.iter().filter_map(|s| s.label.clone()).collect();
    labels.sort();
    labels.dedup();

    Some(NearbySummary {
        average_value: total / nearby.len() as f64,
        max_value,
        labels,
        point_count: nearby.len(),
    })
}

/// Total-ordered coordinate key for grouping exact duplicates.
#[derive(Debug, Clone, Copy)]
struct OrderedCoord(f64);

impl PartialEq for OrderedCoord {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0).is_eq()
    }
}

impl Eq for OrderedCoord {}

impl PartialOrd for OrderedCoord {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedCoord {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    fn samples() -> Vec<WeightedSample> {
        vec![
            WeightedSample::new(LatLon::new(32.70, -96.90), 1_000.0),
            WeightedSample::new(LatLon::new(32.90, -96.60), 150_000.0),
            WeightedSample::new(LatLon::new(32.80, -96.75), 40_000.0),
        ]
    }

    #[test]
    fn grid_has_resolution_squared_cells_within_unit_interval() {
        for scale in [
            ColorScale::MinMax,
            ColorScale::DoubleLog,
            ColorScale::PercentileRank,
        ] {
            let config = GridConfig {
                resolution: 10,
                scale,
                ..GridConfig::traffic()
            };
            let grid = interpolate_grid(&samples(), &config);
            assert_eq!(grid.len(), 100);
            assert!(
                grid.iter()
                    .all(|c| (0.0..=1.0).contains(&c.normalized_value) && c.value.is_finite())
            );
        }
    }

    #[test]
    fn interpolated_values_stay_within_sample_range() {
        let grid = interpolate_grid(&samples(), &GridConfig::density());
        assert_eq!(grid.len(), 2_500);
        assert!(
            grid.iter()
                .all(|c| c.value >= 1_000.0 - 1e-6 && c.value <= 150_000.0 + 1e-6)
        );
    }

    #[test]
    fn empty_samples_give_empty_grid() {
        assert!(interpolate_grid(&[], &GridConfig::traffic()).is_empty());
    }

    #[test]
    fn single_sample_grid_is_degenerate_but_finite() {
        let grid = interpolate_grid(
            &[WeightedSample::new(LatLon::new(32.8, -96.8), 10.0)],
            &GridConfig {
                resolution: 3,
                scale: ColorScale::MinMax,
                ..GridConfig::traffic()
            },
        );
        assert_eq!(grid.len(), 9);
        assert!(grid.iter().all(|c| (c.value - 10.0).abs() < 1e-9));
        assert!(grid.iter().all(|c| c.normalized_value.abs() < f64::EPSILON));
    }

    #[test]
    fn color_scale_parses_from_kebab_case() {
        assert_eq!("double-log".parse::<ColorScale>().unwrap(), ColorScale::DoubleLog);
        assert_eq!(ColorScale::PercentileRank.to_string(), "percentile-rank");
    }

    #[test]
    fn density_samples_count_coincident_points() {
        let ts = chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let observations = vec![
            Observation::new(32.8, -96.8, ts),
            Observation::new(32.7, -96.9, ts),
            Observation::new(32.8, -96.8, ts),
        ];
        let samples = density_samples(&observations);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].position, LatLon::new(32.7, -96.9));
        assert!((samples[0].value - 1.0).abs() < f64::EPSILON);
        assert!((samples[1].value - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn nearby_summary_reports_labels_and_stats() {
        let mut samples = samples();
        samples[0].label = Some("IH 35E".to_string());
        samples[2].label = Some("IH 30".to_string());
        let summary = nearby_summary(&samples, LatLon::new(32.75, -96.82), 0.1).unwrap();
        assert_eq!(summary.point_count, 2);
        assert!((summary.average_value - 20_500.0).abs() < 1e-9);
        assert!((summary.max_value - 40_000.0).abs() < 1e-9);
        assert_eq!(summary.labels, vec!["IH 30".to_string(), "IH 35E".to_string()]);

        assert!(nearby_summary(&samples, LatLon::new(0.0, 0.0), 0.1).is_none());
    }

    #[test]
    fn weighted_observation_requires_hint() {
        let ts = chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let plain = Observation::new(32.8, -96.8, ts);
        assert!(WeightedSample::from_weighted_observation(&plain).is_none());
        let counted = plain.with_weight(52_000.0).with_category("LOOP 12");
        let sample = WeightedSample::from_weighted_observation(&counted).unwrap();
        assert_eq!(sample.label.as_deref(), Some("LOOP 12"));
    }
}
