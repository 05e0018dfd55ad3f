//! CSV observation loader.
//!
//! Reads a headered CSV (from a file or any reader), deserializes each row
//! into a [`RawObservation`], and validates it. Rows that fail to
//! deserialize count as dropped just like rows that fail validation; only
//! an I/O failure of the underlying stream aborts the load.

use std::io::Read;
use std::path::Path;

use risk_map_geography_models::BoundingBox;
use risk_map_observation_models::{Observation, RawObservation};

use crate::parsing::{ParseReport, parse_batch};
use crate::ObservationError;

/// Reads and validates observations from a CSV stream.
///
/// # Errors
///
/// Returns [`ObservationError`] if the header row cannot be read or the
/// underlying stream fails.
pub fn read_observations<R: Read>(
    reader: R,
    bounds: &BoundingBox,
) -> Result<(Vec<Observation>, ParseReport), ObservationError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    // Fail early on a stream without a readable header row.
    reader.headers()?;

    let mut undecodable = 0;
    let mut raws = Vec::new();

    for result in reader.deserialize::<RawObservation>() {
        match result {
            Ok(raw) => raws.push(raw),
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                undecodable += 1;
                log::debug!("Dropping undecodable CSV row: {e}");
            }
        }
    }

    let (observations, mut report) = parse_batch(raws, bounds);
    report.dropped += undecodable;

    log::info!(
        "Loaded {} observations from CSV ({} dropped)",
        report.accepted,
        report.dropped
    );

    Ok((observations, report))
}

/// Reads and validates observations from a CSV file.
///
/// # Errors
///
/// Returns [`ObservationError`] if the file cannot be opened or read.
pub fn load_observations(
    path: &Path,
    bounds: &BoundingBox,
) -> Result<(Vec<Observation>, ParseReport), ObservationError> {
    let file = std::fs::File::open(path)?;
    log::info!("Reading observations from {}", path.display());
    read_observations(file, bounds)
}
