//! Interpolated grid export.
//!
//! Grids are written as CSV with one row per cell in mesh order.

use std::path::Path;

use risk_map_geography_models::GridCell;
use serde::Serialize;

/// One exported cell. The header row is written separately so the value
/// column can be named after the surface.
#[derive(Debug, Serialize)]
struct GridRow {
    latitude: f64,
    longitude: f64,
    value: f64,
    color_scale: f64,
}

/// Column header used for the raw value of each surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// Traffic volume (`weighted_aadt`).
    Traffic,
    /// Incident density (`incident_density`).
    Density,
}

impl Surface {
    const fn value_column(self) -> &'static str {
        match self {
            Self::Traffic => "weighted_aadt",
            Self::Density => "incident_density",
        }
    }
}

/// Writes `cells` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_grid(path: &Path, surface: Surface, cells: &[GridCell]) -> Result<(), csv::Error> {
    risk_map_stats::paths::ensure_parent_dir(path)?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(["latitude", "longitude", surface.value_column(), "color_scale"])?;
    for cell in cells {
        writer.serialize(GridRow {
            latitude: cell.latitude,
            longitude: cell.longitude,
            value: cell.value,
            color_scale: cell.normalized_value,
        })?;
    }
    writer.flush()?;
    log::info!("Wrote {} grid cells to {}", cells.len(), path.display());
    Ok(())
}
