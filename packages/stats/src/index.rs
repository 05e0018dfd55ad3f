//! R-tree over anchor positions for radius lookups.

use risk_map_geography_models::{AnchorId, AnchorPoint, LatLon};
use rstar::{AABB, RTree, RTreeObject};

/// An anchor stored in the R-tree, keyed `[longitude, latitude]`.
struct AnchorEntry {
    id: AnchorId,
    position: LatLon,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for AnchorEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Spatial index over a fixed anchor set.
pub struct AnchorIndex {
    tree: RTree<AnchorEntry>,
}

impl AnchorIndex {
    /// Bulk-loads every anchor.
    #[must_use]
    pub fn build(anchors: &[AnchorPoint]) -> Self {
        let entries = anchors
            .iter()
            .map(|anchor| AnchorEntry {
                id: anchor.id,
                position: anchor.position(),
                envelope: AABB::from_point([anchor.longitude, anchor.latitude]),
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Anchors within `radius` degrees of `center` (inclusive), with their
    /// distances, in id order.
    #[must_use]
    pub fn within(&self, center: LatLon, radius: f64) -> Vec<(AnchorId, f64)> {
        if !radius.is_finite() || radius < 0.0 || !center.is_finite() {
            return Vec::new();
        }

        let search = AABB::from_corners(
            [center.longitude - radius, center.latitude - radius],
            [center.longitude + radius, center.latitude + radius],
        );

        let mut hits: Vec<(AnchorId, f64)> = self
            .tree
            .locate_in_envelope(&search)
            .filter_map(|entry| {
                let distance = entry.position.distance(&center);
                (distance <= radius).then_some((entry.id, distance))
            })
            .collect();
        hits.sort_by_key(|(id, _)| *id);
        hits
    }
}

impl std::fmt::Debug for AnchorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnchorIndex")
            .field("anchors", &self.tree.size())
            .finish()
    }
}
