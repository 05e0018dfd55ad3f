#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record and query result types for the rolling statistics store.
//!
//! These types cross the store's public boundary (query results, snapshot
//! rows, persisted metadata). The store's internal per-cell layout lives in
//! `risk_map_stats`.

use chrono::NaiveDate;
use risk_map_geography_models::{AnchorId, BoundingBox};
use risk_map_observation_models::Category;
use serde::{Deserialize, Serialize};

/// Kernel-weighted totals per coarse category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWeights {
    /// Violent weight.
    pub violent: f64,
    /// Property weight.
    pub property: f64,
    /// Other weight.
    pub other: f64,
}

impl CategoryWeights {
    /// Adds `weight` to the bucket for `category`.
    pub fn add(&mut self, category: Category, weight: f64) {
        match category {
            Category::Violent => self.violent += weight,
            Category::Property => self.property += weight,
            Category::Other => self.other += weight,
        }
    }

    /// Weight for one category.
    #[must_use]
    pub const fn get(&self, category: Category) -> f64 {
        match category {
            Category::Violent => self.violent,
            Category::Property => self.property,
            Category::Other => self.other,
        }
    }

    /// Sum across all categories.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.violent + self.property + self.other
    }
}

/// One (anchor, month) row of the store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorMonthlyStat {
    /// Anchor this row belongs to.
    pub anchor: AnchorId,
    /// Anchor latitude.
    pub latitude: f64,
    /// Anchor longitude.
    pub longitude: f64,
    /// First day of the month.
    pub month: NaiveDate,
    /// Min-max normalized `total_weight` within the month, in `[0, 1]`.
    pub risk_score: f64,
    /// Kernel-weighted observation total.
    pub total_weight: f64,
    /// Per-category breakdown of `total_weight`.
    pub category_weights: CategoryWeights,
}

/// One month of a location query, averaged over the anchors in range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrendPoint {
    /// First day of the month.
    pub month: NaiveDate,
    /// Weighted mean risk score.
    pub risk_score: f64,
    /// Weighted mean total weight.
    pub total_weight: f64,
    /// Weighted mean per-category weights.
    pub category_weights: CategoryWeights,
}

/// Per-category averages over the most recent months of a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentStats {
    /// Mean total weight.
    pub total: f64,
    /// Mean violent weight.
    pub violent: f64,
    /// Mean property weight.
    pub property: f64,
    /// Mean other weight.
    pub other: f64,
}

/// Result bundle of a point/radius query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskQueryResult {
    /// Risk score of the most recent month.
    pub current_risk: f64,
    /// One point per month, oldest first.
    pub monthly_trend: Vec<MonthlyTrendPoint>,
    /// Averages over the last (up to) three months.
    pub recent_stats: RecentStats,
    /// Number of anchors that fell within the query radius.
    pub anchor_count: usize,
}

/// One anchor of the latest-month heatmap snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapPoint {
    /// Anchor latitude.
    pub latitude: f64,
    /// Anchor longitude.
    pub longitude: f64,
    /// Latest-month risk score.
    pub risk_score: f64,
}

/// A snapshot point with a rendering opacity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayPoint {
    /// Anchor latitude.
    pub latitude: f64,
    /// Anchor longitude.
    pub longitude: f64,
    /// Latest-month risk score.
    pub risk_score: f64,
    /// Fill opacity in `[0.1, 0.7]`.
    pub opacity: f64,
}

/// Describes the mesh a persisted store was built with.
///
/// Written next to the statistics table so that a store is never loaded
/// against a different mesh than the one that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreMetadata {
    /// Layout version of the persisted files.
    pub version: u32,
    /// Target bounds of the mesh (before buffering).
    pub bounds: BoundingBox,
    /// Anchors per side.
    pub resolution: u32,
    /// Buffer fraction the mesh was built with.
    pub buffer_fraction: f64,
    /// Total number of anchors.
    pub anchor_count: usize,
    /// Months present in the table, ascending.
    pub months: Vec<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_weights_accumulate_and_total() {
        let mut weights = CategoryWeights::default();
        weights.add(Category::Violent, 2.0);
        weights.add(Category::Other, 0.5);
        weights.add(Category::Violent, 1.0);
        assert!((weights.get(Category::Violent) - 3.0).abs() < f64::EPSILON);
        assert!((weights.total() - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn metadata_serializes_camel_case_with_iso_months() {
        let meta = StoreMetadata {
            version: 1,
            bounds: BoundingBox::new(-96.95, 32.64, -96.49, 33.04),
            resolution: 20,
            buffer_fraction: 0.05,
            anchor_count: 400,
            months: vec![NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()],
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["anchorCount"], 400);
        assert_eq!(json["bufferFraction"], 0.05);
        assert_eq!(json["months"][0], "2024-01-01");
        let back: StoreMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, meta);
    }
}
