#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types for trend, window, and hotspot aggregation.
//!
//! Category breakdowns are keyed by the source's own category label (e.g.
//! `"BURGLARY"`), not the coarse violent/property/other split used by the
//! statistics store.

use std::collections::BTreeMap;

use chrono::{Datelike as _, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use strum_macros::EnumString;

/// Calendar window used to bucket observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TimeWindow {
    /// Calendar day.
    Day,
    /// ISO week, starting Monday.
    Week,
    /// Calendar month.
    Month,
}

impl TimeWindow {
    /// First day of the window containing `date`.
    #[must_use]
    pub fn start_of(self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Day => date,
            Self::Week => date
                .checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
                .unwrap_or(date),
            Self::Month => date.with_day(1).unwrap_or(date),
        }
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Day => write!(f, "day"),
            Self::Week => write!(f, "week"),
            Self::Month => write!(f, "month"),
        }
    }
}

/// Population and land area used to turn counts into rates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionReference {
    /// Resident population.
    pub population: u64,
    /// Land area in square miles.
    #[serde(alias = "area_sq_mi")]
    pub area_sq_mi: f64,
}

/// Region reference data keyed by region label.
pub type RegionTable = BTreeMap<String, RegionReference>;

/// Counts and rates for one (window, region) bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindowStat {
    /// First day of the window.
    pub window_start: NaiveDate,
    /// Region label.
    pub region: String,
    /// Observations in the bucket.
    pub total_incidents: u64,
    /// Count per category label.
    pub incidents_by_type: BTreeMap<String, u64>,
    /// Incidents per 100,000 residents; 0 for an unknown region.
    pub rate_per_100k: f64,
    /// Incidents per square mile; 0 for an unknown region.
    pub rate_per_area: f64,
}

/// One day of a trailing moving average series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovingAverageRow {
    /// Calendar day.
    pub date: NaiveDate,
    /// Region label.
    pub region: String,
    /// Category label when averaging per category.
    pub category: Option<String>,
    /// Observations on this day.
    pub daily_count: u64,
    /// Mean daily count over the trailing window ending on this day.
    pub moving_average: f64,
}

/// One occupied cell of a hotspot grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotCell {
    /// Cell centre latitude.
    pub center_latitude: f64,
    /// Cell centre longitude.
    pub center_longitude: f64,
    /// Observations in the cell.
    pub incident_count: u64,
    /// Count per category label.
    pub incidents_by_type: BTreeMap<String, u64>,
    /// Region label.
    pub region: String,
}

/// Monthly rate with a short moving average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRate {
    /// First day of the month.
    pub month: NaiveDate,
    /// Region label.
    pub region: String,
    /// Observations in the month.
    pub total_incidents: u64,
    /// Incidents per 100,000 residents.
    pub rate_per_100k: f64,
    /// Mean of `rate_per_100k` over this and up to two preceding months.
    pub moving_average_rate: f64,
    /// Per-100k rate per category label.
    pub rates_by_type: BTreeMap<String, f64>,
}
