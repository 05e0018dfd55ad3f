#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Observation validation, category mapping, and CSV loading.
//!
//! This is the boundary between upstream fetchers and the spatial core.
//! Records arrive as [`RawObservation`]s; anything with missing, non-numeric
//! or out-of-bounds coordinates is dropped and counted, never failing the
//! batch.
//!
//! [`RawObservation`]: risk_map_observation_models::RawObservation

pub mod csv_source;
pub mod parsing;
pub mod type_mapping;

pub use parsing::{ParseReport, parse_batch, parse_observation, retain_in_bounds};
pub use type_mapping::map_category;

/// Errors that can occur while reading observation files.
#[derive(Debug, thiserror::Error)]
pub enum ObservationError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV stream itself could not be read (not a single bad row).
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Why a single record was rejected.
///
/// Rejections are per-record and never abort a batch; they surface only in
/// debug logs and the [`ParseReport`] drop count.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputDataError {
    /// A required field was absent or blank.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    /// A numeric field did not parse as a finite number.
    #[error("field '{field}' is not a finite number: '{value}'")]
    InvalidNumber {
        /// Field name.
        field: &'static str,
        /// Offending text.
        value: String,
    },

    /// The timestamp did not match any accepted format.
    #[error("unparseable timestamp '{0}'")]
    InvalidTimestamp(String),

    /// The coordinates fall outside the region's validity bounds.
    #[error("coordinates ({latitude}, {longitude}) are outside the validity bounds")]
    OutOfBounds {
        /// Rejected latitude.
        latitude: f64,
        /// Rejected longitude.
        longitude: f64,
    },
}
