#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Coordinate, bounding box, and anchor mesh types.
//!
//! Coordinates are planar degrees. Nothing in the risk-map core projects or
//! measures geodesic distance; [`KM_PER_DEGREE`] is the single fixed
//! approximation used wherever a kilometre radius has to become degrees.

use serde::{Deserialize, Serialize};

/// Kilometres per degree used for all radius conversions.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Converts a radius in kilometres to planar degrees.
#[must_use]
pub fn km_to_degrees(km: f64) -> f64 {
    km / KM_PER_DEGREE
}

/// A latitude/longitude pair in planar degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatLon {
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
}

impl LatLon {
    /// Creates a new coordinate pair.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Squared Euclidean distance in degrees².
    #[must_use]
    pub fn distance_squared(&self, other: &Self) -> f64 {
        let dlat = self.latitude - other.latitude;
        let dlon = self.longitude - other.longitude;
        dlat.mul_add(dlat, dlon * dlon)
    }

    /// Euclidean distance in degrees.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Returns `true` when both components are finite numbers.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// A geographic bounding box in planar degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Smallest box containing every point, or `None` for an empty input.
    #[must_use]
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = LatLon>,
    {
        points.into_iter().fold(None, |acc, p| {
            Some(acc.map_or_else(
                || Self::new(p.longitude, p.latitude, p.longitude, p.latitude),
                |b: Self| {
                    Self::new(
                        b.west.min(p.longitude),
                        b.south.min(p.latitude),
                        b.east.max(p.longitude),
                        b.north.max(p.latitude),
                    )
                },
            ))
        })
    }

    /// Latitude extent (north minus south).
    #[must_use]
    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    /// Longitude extent (east minus west).
    #[must_use]
    pub fn lon_span(&self) -> f64 {
        self.east - self.west
    }

    /// Grows each side by `fraction` of the corresponding span.
    ///
    /// A `fraction` of `0.05` adds 5% of the latitude span to both the north
    /// and south edges, and likewise for longitude.
    #[must_use]
    pub fn expanded(&self, fraction: f64) -> Self {
        let lat_buffer = self.lat_span() * fraction;
        let lon_buffer = self.lon_span() * fraction;
        Self::new(
            self.west - lon_buffer,
            self.south - lat_buffer,
            self.east + lon_buffer,
            self.north + lat_buffer,
        )
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, point: LatLon) -> bool {
        point.latitude >= self.south
            && point.latitude <= self.north
            && point.longitude >= self.west
            && point.longitude <= self.east
    }

    /// Returns `true` when the box has finite, correctly ordered edges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        [self.west, self.south, self.east, self.north]
            .iter()
            .all(|v| v.is_finite())
            && self.west <= self.east
            && self.south <= self.north
    }
}

/// Stable identifier of an anchor within a single mesh.
///
/// Ids are assigned in generation order and are only meaningful for the
/// mesh that produced them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AnchorId(pub u32);

impl AnchorId {
    /// Index into anchor-ordered vectors.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for AnchorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "anchor-{}", self.0)
    }
}

/// One node of the fixed anchor mesh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorPoint {
    /// Position of this anchor in its mesh.
    pub id: AnchorId,
    /// Anchor latitude.
    pub latitude: f64,
    /// Anchor longitude.
    pub longitude: f64,
}

impl AnchorPoint {
    /// Returns the anchor position as a [`LatLon`].
    #[must_use]
    pub const fn position(&self) -> LatLon {
        LatLon::new(self.latitude, self.longitude)
    }
}

/// One cell of an interpolated heatmap grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    /// Cell centre latitude.
    pub latitude: f64,
    /// Cell centre longitude.
    pub longitude: f64,
    /// Raw interpolated value.
    pub value: f64,
    /// Value mapped to `[0, 1]` for color scaling.
    pub normalized_value: f64,
}
