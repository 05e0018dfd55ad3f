#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Observation record types and the three-way risk category taxonomy.
//!
//! An [`Observation`] is one validated incident or measurement. Upstream
//! fetchers hand over [`RawObservation`] records with every field optional
//! and stringly typed; the `risk_map_observation` crate turns those into
//! observations, dropping anything malformed.

pub mod month;

use chrono::{DateTime, NaiveDate, Utc};
use risk_map_geography_models::LatLon;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Category label assumed when a record carries none.
pub const DEFAULT_CATEGORY_LABEL: &str = "OTHER";

/// Region label assumed when a record carries none.
pub const UNKNOWN_REGION: &str = "Unknown";

/// Coarse category used for the per-anchor sub-aggregates.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// Crimes against persons (assault, homicide, robbery)
    Violent,
    /// Crimes against property (theft, burglary, auto theft)
    Property,
    /// Everything else, including uncategorized records
    Other,
}

impl Category {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Violent, Self::Property, Self::Other]
    }
}

/// A single validated observation.
///
/// Immutable once ingested. Coordinates are guaranteed finite and inside the
/// validity bounds that were in force when the record was parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// When the incident occurred or the measurement was taken.
    pub timestamp: DateTime<Utc>,
    /// Source category label (e.g. `"BURGLARY"`), if the source had one.
    pub category: Option<String>,
    /// Optional magnitude (e.g. AADT) scaling this observation's weight.
    pub weight_hint: Option<f64>,
    /// City or jurisdiction the record came from.
    pub region: Option<String>,
}

impl Observation {
    /// Creates an uncategorized observation with no weight hint or region.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
            category: None,
            weight_hint: None,
            region: None,
        }
    }

    /// Sets the source category label.
    #[must_use]
    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    /// Sets the region label.
    #[must_use]
    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    /// Sets the weight hint.
    #[must_use]
    pub const fn with_weight(mut self, weight: f64) -> Self {
        self.weight_hint = Some(weight);
        self
    }

    /// Position as a [`LatLon`].
    #[must_use]
    pub const fn position(&self) -> LatLon {
        LatLon::new(self.latitude, self.longitude)
    }

    /// Category label, falling back to [`DEFAULT_CATEGORY_LABEL`].
    #[must_use]
    pub fn category_label(&self) -> &str {
        self.category.as_deref().unwrap_or(DEFAULT_CATEGORY_LABEL)
    }

    /// Region label, falling back to [`UNKNOWN_REGION`].
    #[must_use]
    pub fn region_label(&self) -> &str {
        self.region.as_deref().unwrap_or(UNKNOWN_REGION)
    }

    /// Multiplier applied to this observation's kernel weight.
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight_hint.unwrap_or(1.0)
    }

    /// Calendar date of the observation (UTC).
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// First day of the observation's calendar month.
    #[must_use]
    pub fn month(&self) -> NaiveDate {
        month::month_start(self.date())
    }
}

/// An unvalidated record as handed over by a fetcher or read from a file.
///
/// Every field is optional and textual so that a single malformed value
/// never fails deserialization of the whole batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawObservation {
    /// Latitude text.
    #[serde(default, alias = "Latitude", alias = "lat")]
    pub latitude: Option<String>,
    /// Longitude text.
    #[serde(default, alias = "Longitude", alias = "lon", alias = "lng")]
    pub longitude: Option<String>,
    /// Timestamp text (ISO 8601 date or datetime).
    #[serde(default, alias = "date_of_occurrence", alias = "date")]
    pub timestamp: Option<String>,
    /// Category label. Traffic-count feeds carry the road name here.
    #[serde(
        default,
        alias = "nibrs_crime_category",
        alias = "crime_type",
        alias = "Road Name",
        alias = "road_name"
    )]
    pub category: Option<String>,
    /// Weight hint text.
    #[serde(default, alias = "AADT", alias = "aadt")]
    pub weight_hint: Option<String>,
    /// Region label.
    #[serde(default, alias = "city")]
    pub region: Option<String>,
}
