//! Raw record validation.
//!
//! Turns [`RawObservation`]s into [`Observation`]s. Required fields are
//! latitude, longitude and timestamp; category, weight hint and region are
//! optional and tolerated when missing or malformed.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use risk_map_geography_models::{BoundingBox, LatLon};
use risk_map_observation_models::{Observation, RawObservation};

use crate::InputDataError;

/// Outcome counts for a parsed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseReport {
    /// Records that became observations.
    pub accepted: usize,
    /// Records rejected for any reason.
    pub dropped: usize,
}

impl ParseReport {
    /// Total records seen.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.accepted + self.dropped
    }
}

/// Parses a timestamp in any of the formats open-data portals emit.
///
/// Accepts RFC 3339, ISO 8601 without offset (with or without fractional
/// seconds), a space-separated date and time, and a bare date (midnight).
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn required<'a>(value: Option<&'a String>, field: &'static str) -> Result<&'a str, InputDataError> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or(InputDataError::MissingField(field))
}

fn parse_coordinate(value: &str, field: &'static str) -> Result<f64, InputDataError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| InputDataError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

fn optional_text(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Validates a single raw record against the region's validity bounds.
///
/// # Errors
///
/// Returns [`InputDataError`] describing why the record was rejected.
pub fn parse_observation(
    raw: &RawObservation,
    bounds: &BoundingBox,
) -> Result<Observation, InputDataError> {
    let latitude = parse_coordinate(required(raw.latitude.as_ref(), "latitude")?, "latitude")?;
    let longitude = parse_coordinate(required(raw.longitude.as_ref(), "longitude")?, "longitude")?;

    if !bounds.contains(LatLon::new(latitude, longitude)) {
        return Err(InputDataError::OutOfBounds {
            latitude,
            longitude,
        });
    }

    let timestamp_text = required(raw.timestamp.as_ref(), "timestamp")?;
    let timestamp = parse_timestamp(timestamp_text)
        .ok_or_else(|| InputDataError::InvalidTimestamp(timestamp_text.to_string()))?;

    let weight_hint = optional_text(raw.weight_hint.as_ref()).and_then(|text| {
        let parsed = text.parse::<f64>().ok().filter(|w| w.is_finite() && *w >= 0.0);
        if parsed.is_none() {
            log::debug!("Ignoring unusable weight hint '{text}'");
        }
        parsed
    });

    Ok(Observation {
        latitude,
        longitude,
        timestamp,
        category: optional_text(raw.category.as_ref()),
        weight_hint,
        region: optional_text(raw.region.as_ref()),
    })
}

/// Validates a batch, keeping good records and counting the rest.
pub fn parse_batch<I>(raws: I, bounds: &BoundingBox) -> (Vec<Observation>, ParseReport)
where
    I: IntoIterator<Item = RawObservation>,
{
    let mut report = ParseReport::default();
    let mut observations = Vec::new();

    for raw in raws {
        match parse_observation(&raw, bounds) {
            Ok(obs) => {
                report.accepted += 1;
                observations.push(obs);
            }
            Err(e) => {
                report.dropped += 1;
                log::debug!("Dropping record: {e}");
            }
        }
    }

    if report.dropped > 0 {
        log::info!(
            "Parsed {} observations ({} of {} records dropped)",
            report.accepted,
            report.dropped,
            report.total(),
        );
    }

    (observations, report)
}

/// Drops already-typed observations whose coordinates are non-finite or
/// outside `bounds`.
///
/// Returns the number of observations removed.
pub fn retain_in_bounds(observations: &mut Vec<Observation>, bounds: &BoundingBox) -> usize {
    let before = observations.len();
    observations.retain(|obs| {
        let pos = obs.position();
        pos.is_finite() && bounds.contains(pos)
    });
    before - observations.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dfw() -> BoundingBox {
        BoundingBox::new(-97.5, 32.5, -96.4, 33.1)
    }

    fn raw(lat: &str, lon: &str, ts: &str) -> RawObservation {
        RawObservation {
            latitude: Some(lat.to_string()),
            longitude: Some(lon.to_string()),
            timestamp: Some(ts.to_string()),
            ..RawObservation::default()
        }
    }

    #[test]
    fn parses_timestamp_formats() {
        assert_eq!(
            parse_timestamp("2024-01-15T14:30:00.000").unwrap().to_string(),
            "2024-01-15 14:30:00 UTC"
        );
        assert_eq!(
            parse_timestamp("2024-01-15T14:30:00").unwrap().to_string(),
            "2024-01-15 14:30:00 UTC"
        );
        assert_eq!(
            parse_timestamp("2024-01-15T14:30:00-06:00")
                .unwrap()
                .to_string(),
            "2024-01-15 20:30:00 UTC"
        );
        assert_eq!(
            parse_timestamp("2024-01-15").unwrap().to_string(),
            "2024-01-15 00:00:00 UTC"
        );
        assert!(parse_timestamp("not-a-date").is_none());
    }

    #[test]
    fn accepts_valid_record() {
        let mut record = raw("32.78", "-96.8", "2024-01-15T14:30:00");
        record.category = Some("  BURGLARY ".to_string());
        record.region = Some(String::new());
        let obs = parse_observation(&record, &dfw()).unwrap();
        assert!((obs.latitude - 32.78).abs() < f64::EPSILON);
        assert_eq!(obs.category.as_deref(), Some("BURGLARY"));
        assert!(obs.region.is_none());
    }

    #[test]
    fn rejects_out_of_bounds() {
        let err = parse_observation(&raw("40.7", "-74.0", "2024-01-15"), &dfw()).unwrap_err();
        assert!(matches!(err, InputDataError::OutOfBounds { .. }));
    }

    #[test]
    fn rejects_non_numeric_and_missing() {
        assert_eq!(
            parse_observation(&raw("abc", "-96.8", "2024-01-15"), &dfw()).unwrap_err(),
            InputDataError::InvalidNumber {
                field: "latitude",
                value: "abc".to_string()
            }
        );
        assert!(matches!(
            parse_observation(&raw("NaN", "-96.8", "2024-01-15"), &dfw()).unwrap_err(),
            InputDataError::InvalidNumber { .. }
        ));
        let mut missing = raw("32.78", "-96.8", "2024-01-15");
        missing.longitude = Some("   ".to_string());
        assert_eq!(
            parse_observation(&missing, &dfw()).unwrap_err(),
            InputDataError::MissingField("longitude")
        );
    }

    #[test]
    fn bad_weight_hint_is_ignored_not_fatal() {
        let mut record = raw("32.78", "-96.8", "2024-01-15");
        record.weight_hint = Some("lots".to_string());
        let obs = parse_observation(&record, &dfw()).unwrap();
        assert!(obs.weight_hint.is_none());
    }

    #[test]
    fn batch_drops_bad_rows_and_keeps_the_rest() {
        let (observations, report) = parse_batch(
            vec![
                raw("32.78", "-96.8", "2024-01-15"),
                raw("", "-96.8", "2024-01-15"),
                raw("32.75", "-97.33", "garbage"),
                raw("32.85", "-96.75", "2024-02-01T00:00:00"),
            ],
            &dfw(),
        );
        assert_eq!(observations.len(), 2);
        assert_eq!(report, ParseReport { accepted: 2, dropped: 2 });
    }

    #[test]
    fn retain_in_bounds_removes_stray_points() {
        let ts = parse_timestamp("2024-01-15").unwrap();
        let mut observations = vec![
            Observation::new(32.78, -96.8, ts),
            Observation::new(0.0, 0.0, ts),
            Observation::new(f64::NAN, -96.8, ts),
        ];
        assert_eq!(retain_in_bounds(&mut observations, &dfw()), 2);
        assert_eq!(observations.len(), 1);
    }
}
