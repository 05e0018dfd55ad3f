//! Fixed anchor mesh.
//!
//! Anchors are laid out on an evenly spaced `resolution × resolution`
//! lattice over the target bounds grown by a buffer fraction. Generation
//! is row-major: rows run south to north, and within a row anchors run
//! west to east, so `AnchorId(row * resolution + col)`.

use risk_map_geography_models::{AnchorId, AnchorPoint, BoundingBox, LatLon};

/// Fraction of each span added on every side of the target bounds.
pub const DEFAULT_BUFFER_FRACTION: f64 = 0.05;

/// An immutable set of anchors generated from bounds and resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorMesh {
    bounds: BoundingBox,
    resolution: u32,
    buffer_fraction: f64,
    anchors: Vec<AnchorPoint>,
}

impl AnchorMesh {
    /// Builds the mesh with the default 5% buffer.
    #[must_use]
    pub fn build(bounds: BoundingBox, resolution: u32) -> Self {
        Self::build_with_buffer(bounds, resolution, DEFAULT_BUFFER_FRACTION)
    }

    /// Builds the mesh with an explicit buffer fraction.
    ///
    /// Invalid bounds produce an empty mesh.
    #[must_use]
    pub fn build_with_buffer(bounds: BoundingBox, resolution: u32, buffer_fraction: f64) -> Self {
        let anchors = if bounds.is_valid() && buffer_fraction.is_finite() {
            let extent = bounds.expanded(buffer_fraction);
            let lats = linspace(extent.south, extent.north, resolution);
            let lons = linspace(extent.west, extent.east, resolution);

            let mut anchors = Vec::with_capacity(lats.len() * lons.len());
            let mut next_id = 0_u32;
            for &latitude in &lats {
                for &longitude in &lons {
                    anchors.push(AnchorPoint {
                        id: AnchorId(next_id),
                        latitude,
                        longitude,
                    });
                    next_id += 1;
                }
            }
            anchors
        } else {
            log::warn!("Refusing to build an anchor mesh over invalid bounds {bounds:?}");
            Vec::new()
        };

        Self {
            bounds,
            resolution,
            buffer_fraction,
            anchors,
        }
    }

    /// Target bounds the mesh was built for (before buffering).
    #[must_use]
    pub const fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Bounds actually covered by anchors (after buffering).
    #[must_use]
    pub fn extent(&self) -> BoundingBox {
        self.bounds.expanded(self.buffer_fraction)
    }

    /// Anchors per side.
    #[must_use]
    pub const fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Buffer fraction used to grow the bounds.
    #[must_use]
    pub const fn buffer_fraction(&self) -> f64 {
        self.buffer_fraction
    }

    /// Anchors in generation order.
    #[must_use]
    pub fn anchors(&self) -> &[AnchorPoint] {
        &self.anchors
    }

    /// Anchor positions in generation order.
    #[must_use]
    pub fn positions(&self) -> Vec<LatLon> {
        self.anchors.iter().map(AnchorPoint::position).collect()
    }

    /// Looks up an anchor by id.
    #[must_use]
    pub fn get(&self, id: AnchorId) -> Option<&AnchorPoint> {
        self.anchors.get(id.index())
    }

    /// Number of anchors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Returns `true` if the mesh has no anchors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Consumes the mesh, returning its anchors.
    #[must_use]
    pub fn into_anchors(self) -> Vec<AnchorPoint> {
        self.anchors
    }
}

/// `n` evenly spaced values from `start` to `end`, both endpoints included.
///
/// A single value is the midpoint; zero values is empty.
#[must_use]
pub fn linspace(start: f64, end: f64, n: u32) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start.midpoint(end)],
        _ => {
            let step = (end - start) / f64::from(n - 1);
            (0..n)
                .map(|i| {
                    if i == n - 1 {
                        end
                    } else {
                        step.mul_add(f64::from(i), start)
                    }
                })
                .collect()
        }
    }
}
