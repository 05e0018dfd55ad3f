//! CSV table and JSON metadata persistence.
//!
//! The table has one row per (anchor, month), anchor-major with months
//! ascending inside each anchor, so a table with `A` anchors and `M` months
//! has exactly `A × M` rows. Writes always replace the whole file.

use std::path::Path;

use chrono::NaiveDate;
use risk_map_stats_models::StoreMetadata;
use serde::{Deserialize, Serialize};

use crate::StatsError;
use crate::paths::ensure_parent_dir;

/// Current layout version recorded in the metadata sidecar.
pub const LAYOUT_VERSION: u32 = 1;

/// One persisted (anchor, month) row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatRow {
    /// Anchor latitude.
    pub latitude: f64,
    /// Anchor longitude.
    pub longitude: f64,
    /// First day of the month, `YYYY-MM-DD`.
    pub month: NaiveDate,
    /// Normalized risk score.
    pub risk_score: f64,
    /// Total kernel weight.
    pub crime_count: f64,
    /// Violent kernel weight.
    pub violent_count: f64,
    /// Property kernel weight.
    pub property_count: f64,
    /// Other kernel weight.
    pub other_count: f64,
}

impl StatRow {
    /// Returns `true` when every numeric field is finite.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.risk_score.is_finite()
            && self.crime_count.is_finite()
            && self.violent_count.is_finite()
            && self.property_count.is_finite()
            && self.other_count.is_finite()
    }
}

/// Writes the table, replacing any existing file.
///
/// # Errors
///
/// Returns [`StatsError`] if the file cannot be created or written.
pub fn write_table<'a, I>(path: &Path, rows: I) -> Result<usize, StatsError>
where
    I: IntoIterator<Item = &'a StatRow>,
{
    ensure_parent_dir(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    let mut count = 0;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

/// Reads every row of the table.
///
/// # Errors
///
/// Returns [`StatsError::Io`] if the file cannot be read and
/// [`StatsError::Corruption`] if any row fails to parse or holds a
/// non-finite value.
pub fn read_table(path: &Path) -> Result<Vec<StatRow>, StatsError> {
    let file = std::fs::File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut rows = Vec::new();

    for (line, result) in reader.deserialize::<StatRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                return Err(StatsError::Corruption(format!(
                    "row {} of {}: {e}",
                    line + 1,
                    path.display()
                )));
            }
        };
        if !row.is_finite() {
            return Err(StatsError::Corruption(format!(
                "row {} of {} holds a non-finite value",
                line + 1,
                path.display()
            )));
        }
        rows.push(row);
    }

    Ok(rows)
}

/// Writes the metadata sidecar.
///
/// # Errors
///
/// Returns [`StatsError`] if serialization or the write fails.
pub fn write_metadata(path: &Path, metadata: &StoreMetadata) -> Result<(), StatsError> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(metadata)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Reads the metadata sidecar.
///
/// # Errors
///
/// Returns [`StatsError::Io`] if the file cannot be read and
/// [`StatsError::Corruption`] if it is not valid metadata.
pub fn read_metadata(path: &Path) -> Result<StoreMetadata, StatsError> {
    let text = std::fs::read_to_string(path)?;
    let metadata: StoreMetadata = serde_json::from_str(&text)
        .map_err(|e| StatsError::Corruption(format!("{}: {e}", path.display())))?;
    if metadata.version != LAYOUT_VERSION {
        return Err(StatsError::Corruption(format!(
            "{} has layout version {}, expected {LAYOUT_VERSION}",
            path.display(),
            metadata.version
        )));
    }
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("risk_map_persist_{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    fn row(month: u32, risk: f64) -> StatRow {
        StatRow {
            latitude: 32.812_345_678_9,
            longitude: -96.701_234_567_8,
            month: NaiveDate::from_ymd_opt(2024, month, 1).unwrap(),
            risk_score: risk,
            crime_count: 1234.567_890_123,
            violent_count: 0.000_001_234,
            property_count: 1000.0,
            other_count: 234.567_888_889,
        }
    }

    #[test]
    fn table_has_expected_header_and_date_format() {
        let path = temp_path("stats.csv");
        write_table(&path, &[row(1, 0.5)]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "latitude,longitude,month,risk_score,crime_count,violent_count,property_count,other_count"
        );
        assert!(lines.next().unwrap().contains(",2024-01-01,"));
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn rows_survive_a_write_and_read() {
        let path = temp_path("stats.csv");
        let rows = vec![row(1, 0.0), row(2, 0.333_333_333_333), row(3, 1.0)];
        assert_eq!(write_table(&path, &rows).unwrap(), 3);
        let back = read_table(&path).unwrap();
        assert_eq!(back.len(), 3);
        for (a, b) in rows.iter().zip(&back) {
            assert_eq!(a.month, b.month);
            assert!((a.risk_score - b.risk_score).abs() < 1e-6);
            assert!((a.crime_count - b.crime_count).abs() < 1e-6);
            assert!((a.violent_count - b.violent_count).abs() < 1e-6);
            assert!((a.latitude - b.latitude).abs() < 1e-6);
        }
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn garbage_is_reported_as_corruption() {
        let path = temp_path("stats.csv");
        ensure_parent_dir(&path).unwrap();
        std::fs::write(
            &path,
            "latitude,longitude,month,risk_score,crime_count,violent_count,property_count,other_count\n\
             32.8,-96.8,not-a-month,0.5,1,0,1,0\n",
        )
        .unwrap();
        assert!(matches!(read_table(&path), Err(StatsError::Corruption(_))));

        let meta = path.with_file_name("stats.meta.json");
        std::fs::write(&meta, "{ not json").unwrap();
        assert!(matches!(read_metadata(&meta), Err(StatsError::Corruption(_))));
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}
