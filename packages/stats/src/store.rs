//! The rolling statistics store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use risk_map_geography_models::{AnchorId, AnchorPoint, LatLon};
use risk_map_observation::map_category;
use risk_map_observation_models::Observation;
use risk_map_observation_models::month::{add_months, month_range, month_start, trailing_months};
use risk_map_spatial::normalize::{Normalization, min_max_in_place};
use risk_map_spatial::{AnchorScoreSource, Kernel, row_normalize};
use risk_map_stats_models::{
    AnchorMonthlyStat, CategoryWeights, HeatmapPoint, MonthlyTrendPoint, OverlayPoint,
    RecentStats, RiskQueryResult, StoreMetadata,
};

use crate::index::AnchorIndex;
use crate::persist::{self, LAYOUT_VERSION, StatRow};
use crate::{MeshSpec, RECENT_MONTHS, StatsError, UpdateSummary, WINDOW_MONTHS};

/// Opacity of a zero-risk overlay cell.
const OVERLAY_BASE_OPACITY: f64 = 0.1;

/// Opacity added at full risk.
const OVERLAY_OPACITY_RANGE: f64 = 0.6;

/// Statistics for one anchor in one month.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct CellStat {
    risk_score: f64,
    total_weight: f64,
    category_weights: CategoryWeights,
}

/// Per-anchor monthly statistics over a trailing window of at most
/// [`WINDOW_MONTHS`] months.
///
/// Every month present holds exactly one cell per anchor. A store opened
/// from a path writes itself back after every update; an in-memory store
/// never touches the filesystem.
#[derive(Debug)]
pub struct RollingStatsStore {
    mesh: MeshSpec,
    anchors: Vec<AnchorPoint>,
    index: AnchorIndex,
    months: BTreeMap<NaiveDate, Vec<CellStat>>,
    path: Option<PathBuf>,
}

impl RollingStatsStore {
    /// Opens the store at `path`, creating it if needed, with the trailing
    /// window ending at the current UTC month.
    ///
    /// # Errors
    ///
    /// See [`Self::initialize_at`].
    pub fn initialize(path: &Path, mesh: MeshSpec) -> Result<Self, StatsError> {
        Self::initialize_at(path, mesh, Utc::now().date_naive())
    }

    /// Opens the store at `path`, creating it if needed.
    ///
    /// When no table exists, builds the mesh, creates zeroed rows for the
    /// twelve months ending at `today`'s month, and writes them. When a
    /// table exists it is loaded as-is. Unreadable or inconsistent
    /// persisted data is logged, discarded and rebuilt.
    ///
    /// # Errors
    ///
    /// * [`StatsError::MeshMismatch`] if the persisted store was built on a
    ///   different mesh than `mesh`
    /// * [`StatsError::Io`] / [`StatsError::Csv`] / [`StatsError::Json`] if
    ///   the files cannot be read or written
    pub fn initialize_at(path: &Path, mesh: MeshSpec, today: NaiveDate) -> Result<Self, StatsError> {
        if path.exists() {
            match Self::load(path, mesh) {
                Ok(store) => {
                    log::info!(
                        "Loaded rolling stats from {} ({} anchors, {} months)",
                        path.display(),
                        store.anchors.len(),
                        store.months.len()
                    );
                    return Ok(store);
                }
                Err(StatsError::Corruption(reason)) => {
                    log::warn!(
                        "Discarding corrupt rolling stats at {}: {reason}",
                        path.display()
                    );
                }
                Err(e) => return Err(e),
            }
        }

        let mut store = Self::in_memory(mesh, today);
        store.path = Some(path.to_path_buf());
        store.save()?;
        log::info!(
            "Initialized rolling stats at {} ({} anchors, {} months)",
            path.display(),
            store.anchors.len(),
            store.months.len()
        );
        Ok(store)
    }

    /// Creates a zeroed store that is never persisted.
    #[must_use]
    pub fn in_memory(mesh: MeshSpec, today: NaiveDate) -> Self {
        let anchors = mesh.build().into_anchors();
        let zeroed = vec![CellStat::default(); anchors.len()];
        let months = trailing_months(today, WINDOW_MONTHS)
            .into_iter()
            .map(|month| (month, zeroed.clone()))
            .collect();
        Self::from_parts(mesh, anchors, months, None)
    }

    fn from_parts(
        mesh: MeshSpec,
        anchors: Vec<AnchorPoint>,
        months: BTreeMap<NaiveDate, Vec<CellStat>>,
        path: Option<PathBuf>,
    ) -> Self {
        let index = AnchorIndex::build(&anchors);
        Self {
            mesh,
            anchors,
            index,
            months,
            path,
        }
    }

    fn load(path: &Path, requested: MeshSpec) -> Result<Self, StatsError> {
        let meta_path = crate::paths::metadata_path(path);
        if !meta_path.exists() {
            return Err(StatsError::Corruption(format!(
                "missing metadata sidecar {}",
                meta_path.display()
            )));
        }
        let metadata = persist::read_metadata(&meta_path)?;

        let persisted = MeshSpec {
            bounds: metadata.bounds,
            resolution: metadata.resolution,
            buffer_fraction: metadata.buffer_fraction,
        };
        if !persisted.matches(&requested) {
            return Err(StatsError::MeshMismatch {
                persisted,
                requested,
            });
        }

        let anchors = persisted.build().into_anchors();
        if anchors.len() != metadata.anchor_count {
            return Err(StatsError::Corruption(format!(
                "metadata lists {} anchors but the mesh has {}",
                metadata.anchor_count,
                anchors.len()
            )));
        }
        if metadata.months.len() > WINDOW_MONTHS as usize
            || metadata.months.windows(2).any(|w| w[0] >= w[1])
            || metadata.months.iter().any(|m| month_start(*m) != *m)
        {
            return Err(StatsError::Corruption(
                "metadata month list is not an ascending set of month keys".to_string(),
            ));
        }

        let rows = persist::read_table(path)?;
        let months = assemble(&anchors, &metadata.months, &rows)?;
        Ok(Self::from_parts(
            persisted,
            anchors,
            months,
            Some(path.to_path_buf()),
        ))
    }

    /// Writes the table and metadata sidecar. A no-op for in-memory stores.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError`] if either file cannot be written.
    pub fn save(&self) -> Result<(), StatsError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let rows: Vec<StatRow> = self
            .rows()
            .iter()
            .map(|stat| StatRow {
                latitude: stat.latitude,
                longitude: stat.longitude,
                month: stat.month,
                risk_score: stat.risk_score,
                crime_count: stat.total_weight,
                violent_count: stat.category_weights.violent,
                property_count: stat.category_weights.property,
                other_count: stat.category_weights.other,
            })
            .collect();

        let written = persist::write_table(path, &rows)?;
        persist::write_metadata(&crate::paths::metadata_path(path), &self.metadata())?;
        log::debug!("Wrote {written} rolling stat rows to {}", path.display());
        Ok(())
    }

    /// Folds a batch of observations into the window.
    ///
    /// The window's upper month becomes the batch's latest month and the
    /// lower month is eleven months before it. Months outside the window
    /// are evicted, missing window months are added zeroed, and every
    /// anchor's totals for each month present in the batch are replaced
    /// (not accumulated). Risk scores are then min-max normalized per
    /// updated month; a month where every anchor has the same total keeps
    /// its previous scores.
    ///
    /// Observations with non-finite coordinates or a non-finite or negative
    /// weight are rejected and counted. An empty batch, or one with nothing
    /// usable, changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError`] if persisting a file-backed store fails. The
    /// in-memory state is updated either way.
    pub fn update(&mut self, observations: &[Observation]) -> Result<UpdateSummary, StatsError> {
        let (usable, rejected): (Vec<&Observation>, Vec<&Observation>) =
            observations.iter().partition(|obs| is_usable(obs));
        for obs in &rejected {
            log::debug!(
                "Rejecting observation at ({}, {}) with weight {}",
                obs.latitude,
                obs.longitude,
                obs.weight()
            );
        }

        let Some(upper) = usable.iter().map(|obs| obs.month()).max() else {
            log::debug!("No usable observations in update batch; store unchanged");
            return Ok(UpdateSummary {
                rejected: rejected.len(),
                ..UpdateSummary::default()
            });
        };
        let lower = add_months(upper, 1 - WINDOW_MONTHS.cast_signed());

        if let Some(latest) = self.latest_month()
            && upper < latest
        {
            log::warn!("Update batch ends at {upper}, before the stored window end {latest}; window moves backwards");
        }

        let mut summary = UpdateSummary {
            rejected: rejected.len(),
            ..UpdateSummary::default()
        };

        let before = self.months.len();
        self.months.retain(|month, _| *month >= lower && *month <= upper);
        summary.months_evicted = before - self.months.len();

        for month in month_range(lower, upper) {
            self.months
                .entry(month)
                .or_insert_with(|| vec![CellStat::default(); self.anchors.len()]);
        }

        let mut by_month: BTreeMap<NaiveDate, Vec<&Observation>> = BTreeMap::new();
        for obs in usable {
            let month = obs.month();
            if month < lower {
                summary.ignored += 1;
            } else {
                summary.applied += 1;
                by_month.entry(month).or_default().push(obs);
            }
        }

        let kernel = Kernel::INVERSE_SQUARE;
        for (month, batch) in by_month {
            let Some(cells) = self.months.get_mut(&month) else {
                continue;
            };

            for (cell, anchor) in cells.iter_mut().zip(&self.anchors) {
                let position = anchor.position();
                let mut category_weights = CategoryWeights::default();
                for obs in &batch {
                    let weight = kernel.weight(position, obs.position()) * obs.weight();
                    category_weights.add(map_category(obs.category_label()), weight);
                }
                cell.total_weight = category_weights.total();
                cell.category_weights = category_weights;
            }

            let mut totals: Vec<f64> = cells.iter().map(|c| c.total_weight).collect();
            match min_max_in_place(&mut totals) {
                Normalization::Applied => {
                    for (cell, risk) in cells.iter_mut().zip(totals) {
                        cell.risk_score = risk;
                    }
                }
                Normalization::Degenerate => {
                    log::debug!("Month {month} has uniform totals; keeping previous risk scores");
                    summary.degenerate_months += 1;
                }
            }

            summary.months_updated.push(month);
        }

        log::info!(
            "Updated {} month(s) from {} observations ({} ignored, {} rejected, {} month(s) evicted)",
            summary.months_updated.len(),
            summary.applied,
            summary.ignored,
            summary.rejected,
            summary.months_evicted
        );

        self.save()?;
        Ok(summary)
    }

    /// Aggregates statistics for every anchor within `radius_degrees` of
    /// `(latitude, longitude)`.
    ///
    /// Anchors are weighted by normalized inverse-square distance. Returns
    /// `None` when no anchor is in range.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn query_location(
        &self,
        latitude: f64,
        longitude: f64,
        radius_degrees: f64,
    ) -> Option<RiskQueryResult> {
        let center = LatLon::new(latitude, longitude);
        let hits = self.index.within(center, radius_degrees);
        if hits.is_empty() {
            return None;
        }

        let kernel = Kernel::INVERSE_SQUARE;
        let mut weights: Vec<f64> = hits
            .iter()
            .map(|(id, _)| kernel.weight(center, self.anchors[id.index()].position()))
            .collect();
        row_normalize(&mut weights);

        let monthly_trend: Vec<MonthlyTrendPoint> = self
            .months
            .iter()
            .map(|(month, cells)| {
                let mut point = MonthlyTrendPoint {
                    month: *month,
                    risk_score: 0.0,
                    total_weight: 0.0,
                    category_weights: CategoryWeights::default(),
                };
                for ((id, _), w) in hits.iter().zip(&weights) {
                    let cell = &cells[id.index()];
                    point.risk_score += w * cell.risk_score;
                    point.total_weight += w * cell.total_weight;
                    point.category_weights.violent += w * cell.category_weights.violent;
                    point.category_weights.property += w * cell.category_weights.property;
                    point.category_weights.other += w * cell.category_weights.other;
                }
                point
            })
            .collect();

        let current_risk = monthly_trend.last().map_or(0.0, |p| p.risk_score);

        let recent = &monthly_trend[monthly_trend.len().saturating_sub(RECENT_MONTHS)..];
        let mut recent_stats = RecentStats::default();
        if !recent.is_empty() {
            let n = recent.len() as f64;
            for point in recent {
                recent_stats.total += point.total_weight / n;
                recent_stats.violent += point.category_weights.violent / n;
                recent_stats.property += point.category_weights.property / n;
                recent_stats.other += point.category_weights.other / n;
            }
        }

        Some(RiskQueryResult {
            current_risk,
            monthly_trend,
            recent_stats,
            anchor_count: hits.len(),
        })
    }

    /// Latest-month risk score for every anchor, in anchor order.
    ///
    /// Empty when the store holds no months.
    #[must_use]
    pub fn current_heatmap_snapshot(&self) -> Vec<HeatmapPoint> {
        let Some(cells) = self.months.values().next_back() else {
            return Vec::new();
        };
        self.anchors
            .iter()
            .zip(cells)
            .map(|(anchor, cell)| HeatmapPoint {
                latitude: anchor.latitude,
                longitude: anchor.longitude,
                risk_score: cell.risk_score,
            })
            .collect()
    }

    /// Snapshot points with `risk_score >= threshold`.
    #[must_use]
    pub fn high_risk_areas(&self, threshold: f64) -> Vec<HeatmapPoint> {
        self.current_heatmap_snapshot()
            .into_iter()
            .filter(|p| p.risk_score >= threshold)
            .collect()
    }

    /// Snapshot points with a fill opacity scaled from risk.
    #[must_use]
    pub fn density_overlay(&self) -> Vec<OverlayPoint> {
        self.current_heatmap_snapshot()
            .into_iter()
            .map(|p| OverlayPoint {
                latitude: p.latitude,
                longitude: p.longitude,
                risk_score: p.risk_score,
                opacity: OVERLAY_OPACITY_RANGE.mul_add(p.risk_score, OVERLAY_BASE_OPACITY),
            })
            .collect()
    }

    /// Snapshot as a `GeoJSON` point collection with a `riskScore`
    /// property on each feature.
    #[must_use]
    pub fn heatmap_geojson(&self) -> FeatureCollection {
        let features = self
            .current_heatmap_snapshot()
            .into_iter()
            .map(|p| {
                let mut properties = JsonObject::new();
                properties.insert("riskScore".to_string(), p.risk_score.into());
                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(Value::Point(vec![p.longitude, p.latitude]))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }

    /// Every row, anchor-major with months ascending.
    #[must_use]
    pub fn rows(&self) -> Vec<AnchorMonthlyStat> {
        let mut rows = Vec::with_capacity(self.anchors.len() * self.months.len());
        for anchor in &self.anchors {
            for (month, cells) in &self.months {
                let cell = &cells[anchor.id.index()];
                rows.push(AnchorMonthlyStat {
                    anchor: anchor.id,
                    latitude: anchor.latitude,
                    longitude: anchor.longitude,
                    month: *month,
                    risk_score: cell.risk_score,
                    total_weight: cell.total_weight,
                    category_weights: cell.category_weights,
                });
            }
        }
        rows
    }

    /// Months currently held, ascending.
    #[must_use]
    pub fn months(&self) -> Vec<NaiveDate> {
        self.months.keys().copied().collect()
    }

    /// Most recent month held, if any.
    #[must_use]
    pub fn latest_month(&self) -> Option<NaiveDate> {
        self.months.keys().next_back().copied()
    }

    /// Mesh this store was built on.
    #[must_use]
    pub const fn mesh(&self) -> MeshSpec {
        self.mesh
    }

    /// Backing file, if the store is persisted.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Looks up one anchor.
    #[must_use]
    pub fn anchor(&self, id: AnchorId) -> Option<&AnchorPoint> {
        self.anchors.get(id.index())
    }

    /// Metadata describing the current contents.
    #[must_use]
    pub fn metadata(&self) -> StoreMetadata {
        StoreMetadata {
            version: LAYOUT_VERSION,
            bounds: self.mesh.bounds,
            resolution: self.mesh.resolution,
            buffer_fraction: self.mesh.buffer_fraction,
            anchor_count: self.anchors.len(),
            months: self.months(),
        }
    }
}

impl AnchorScoreSource for RollingStatsStore {
    fn anchors(&self) -> &[AnchorPoint] {
        &self.anchors
    }

    fn anchor_scores(&self) -> Vec<f64> {
        self.months
            .values()
            .next_back()
            .map(|cells| cells.iter().map(|c| c.risk_score).collect())
            .unwrap_or_default()
    }
}

/// Rebuilds the month map from anchor-major rows, checking that the table
/// is rectangular and matches the mesh.
/// Finite coordinates and a finite, non-negative weight.
fn is_usable(obs: &Observation) -> bool {
    obs.position().is_finite() && obs.weight().is_finite() && obs.weight() >= 0.0
}

fn assemble(
    anchors: &[AnchorPoint],
    months: &[NaiveDate],
    rows: &[StatRow],
) -> Result<BTreeMap<NaiveDate, Vec<CellStat>>, StatsError> {
    const COORD_TOLERANCE: f64 = 1e-9;

    let expected = anchors.len() * months.len();
    if rows.len() != expected {
        return Err(StatsError::Corruption(format!(
            "expected {expected} rows ({} anchors × {} months), found {}",
            anchors.len(),
            months.len(),
            rows.len()
        )));
    }

    let mut map: BTreeMap<NaiveDate, Vec<CellStat>> = months
        .iter()
        .map(|m| (*m, Vec::with_capacity(anchors.len())))
        .collect();

    if months.is_empty() {
        return Ok(map);
    }

    for (anchor, chunk) in anchors.iter().zip(rows.chunks(months.len())) {
        for (month, row) in months.iter().zip(chunk) {
            if row.month != *month {
                return Err(StatsError::Corruption(format!(
                    "{} has month {} where {month} was expected",
                    anchor.id, row.month
                )));
            }
            if (row.latitude - anchor.latitude).abs() > COORD_TOLERANCE
                || (row.longitude - anchor.longitude).abs() > COORD_TOLERANCE
            {
                return Err(StatsError::Corruption(format!(
                    "{} row at ({}, {}) does not match the mesh position ({}, {})",
                    anchor.id, row.latitude, row.longitude, anchor.latitude, anchor.longitude
                )));
            }
            if let Some(cells) = map.get_mut(month) {
                cells.push(CellStat {
                    risk_score: row.risk_score,
                    total_weight: row.crime_count,
                    category_weights: CategoryWeights {
                        violent: row.violent_count,
                        property: row.property_count,
                        other: row.other_count,
                    },
                });
            }
        }
    }

    Ok(map)
}
