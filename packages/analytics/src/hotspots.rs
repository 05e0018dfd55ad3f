//! Fixed-size hotspot grid.
//!
//! Coordinates are floor-divided by the cell size, so cells are aligned to
//! multiples of the cell size (not to the anchor mesh) and negative
//! longitudes bucket the same way as positive ones.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use risk_map_analytics_models::HotspotCell;

use crate::{AnalyticsError, TrendAggregator};

impl TrendAggregator<'_> {
    /// Buckets observations into `cell_size_degrees` square cells, grouped
    /// by region, with a per-category breakdown.
    ///
    /// Rows are ordered by cell (south to north, west to east), then region.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::InvalidCellSize`] if the size is not a
    /// positive finite number.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn hotspot_grid(
        &self,
        cell_size_degrees: f64,
        min: Option<DateTime<Utc>>,
        max: Option<DateTime<Utc>>,
    ) -> Result<Vec<HotspotCell>, AnalyticsError> {
        if !cell_size_degrees.is_finite() || cell_size_degrees <= 0.0 {
            return Err(AnalyticsError::InvalidCellSize(cell_size_degrees));
        }

        let mut cells: BTreeMap<(i64, i64, &str), BTreeMap<String, u64>> = BTreeMap::new();
        for obs in self.filtered(min, max) {
            let row = (obs.latitude / cell_size_degrees).floor() as i64;
            let col = (obs.longitude / cell_size_degrees).floor() as i64;
            *cells
                .entry((row, col, obs.region_label()))
                .or_default()
                .entry(obs.category_label().to_string())
                .or_default() += 1;
        }

        let half = cell_size_degrees / 2.0;
        let hotspots: Vec<HotspotCell> = cells
            .into_iter()
            .map(|((row, col, region), incidents_by_type)| HotspotCell {
                center_latitude: (row as f64).mul_add(cell_size_degrees, half),
                center_longitude: (col as f64).mul_add(cell_size_degrees, half),
                incident_count: incidents_by_type.values().sum(),
                incidents_by_type,
                region: region.to_string(),
            })
            .collect();

        log::debug!(
            "Bucketed observations into {} hotspot cells of {cell_size_degrees}°",
            hotspots.len()
        );
        Ok(hotspots)
    }
}
