//! Trailing moving averages of daily counts.
//!
//! Warm-up convention: the first `window - 1` points of a series average
//! over however many days exist so far (a minimum of one period), so every
//! day in a series has a value. Each series is zero-filled between its own
//! first and last observed day.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use risk_map_analytics_models::MovingAverageRow;

use crate::{AnalyticsError, TrendAggregator};

/// Trailing mean of `values` over `window` points with a minimum of one
/// period.
///
/// `window` of zero is treated as one.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn trailing_means(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut means = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, value) in values.iter().enumerate() {
        sum += value;
        if i >= window {
            sum -= values[i - window];
        }
        let periods = (i + 1).min(window);
        means.push(sum / periods as f64);
    }
    means
}

type SeriesKey<'a> = (&'a str, Option<&'a str>);

impl TrendAggregator<'_> {
    /// Trailing simple moving average of daily counts per region, or per
    /// (region, category label) when `by_category` is set.
    ///
    /// Rows are ordered by region, then category, then date.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::EmptyWindow`] if `window_days` is zero.
    #[allow(clippy::cast_precision_loss)]
    pub fn moving_average(
        &self,
        window_days: usize,
        by_category: bool,
    ) -> Result<Vec<MovingAverageRow>, AnalyticsError> {
        if window_days == 0 {
            return Err(AnalyticsError::EmptyWindow);
        }

        let mut daily: BTreeMap<SeriesKey<'_>, BTreeMap<NaiveDate, u64>> = BTreeMap::new();
        for obs in self.filtered(None, None) {
            let category = by_category.then(|| obs.category_label());
            *daily
                .entry((obs.region_label(), category))
                .or_default()
                .entry(obs.date())
                .or_default() += 1;
        }

        let mut rows = Vec::new();
        for ((region, category), counts) in daily {
            let (Some(first), Some(last)) = (
                counts.keys().next().copied(),
                counts.keys().next_back().copied(),
            ) else {
                continue;
            };

            let days: Vec<NaiveDate> = first.iter_days().take_while(|d| *d <= last).collect();
            let filled: Vec<u64> = days
                .iter()
                .map(|d| counts.get(d).copied().unwrap_or(0))
                .collect();
            let as_f64: Vec<f64> = filled.iter().map(|c| *c as f64).collect();
            let means = trailing_means(&as_f64, window_days);

            for ((date, daily_count), moving_average) in days.into_iter().zip(filled).zip(means) {
                rows.push(MovingAverageRow {
                    date,
                    region: region.to_string(),
                    category: category.map(str::to_string),
                    daily_count,
                    moving_average,
                });
            }
        }

        log::debug!(
            "Computed {}-day moving average: {} rows",
            window_days,
            rows.len()
        );
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use risk_map_observation_models::Observation;

    use super::*;
    use crate::test_support::{at, regions};

    #[test]
    fn warm_up_averages_available_days() {
        let means = trailing_means(&[3.0, 6.0, 9.0, 0.0, 3.0], 3);
        assert!((means[0] - 3.0).abs() < 1e-12);
        assert!((means[1] - 4.5).abs() < 1e-12);
        assert!((means[2] - 6.0).abs() < 1e-12);
        // Steady state: full three-day window.
        assert!((means[3] - 5.0).abs() < 1e-12);
        assert!((means[4] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn window_of_one_is_identity() {
        assert_eq!(trailing_means(&[1.0, 5.0, 2.0], 1), vec![1.0, 5.0, 2.0]);
        assert!(trailing_means(&[], 7).is_empty());
    }

    #[test]
    fn zero_window_is_rejected() {
        let regions = regions();
        assert_eq!(
            TrendAggregator::new(&[], &regions).moving_average(0, false),
            Err(AnalyticsError::EmptyWindow)
        );
    }

    #[test]
    fn series_are_zero_filled_per_region() {
        let data = vec![
            Observation::new(32.78, -96.8, at(2024, 1, 1)).with_region("Dallas"),
            Observation::new(32.78, -96.8, at(2024, 1, 1)).with_region("Dallas"),
            Observation::new(32.78, -96.8, at(2024, 1, 4)).with_region("Dallas"),
            Observation::new(32.75, -97.3, at(2024, 1, 2)).with_region("Fort Worth"),
        ];
        let regions = regions();
        let rows = TrendAggregator::new(&data, &regions)
            .moving_average(2, false)
            .unwrap();

        let dallas: Vec<&MovingAverageRow> = rows.iter().filter(|r| r.region == "Dallas").collect();
        assert_eq!(dallas.len(), 4);
        let counts: Vec<u64> = dallas.iter().map(|r| r.daily_count).collect();
        assert_eq!(counts, vec![2, 0, 0, 1]);
        let averages: Vec<f64> = dallas.iter().map(|r| r.moving_average).collect();
        assert_eq!(averages, vec![2.0, 1.0, 0.0, 0.5]);
        assert!(dallas.iter().all(|r| r.category.is_none()));

        let fort_worth: Vec<&MovingAverageRow> =
            rows.iter().filter(|r| r.region == "Fort Worth").collect();
        assert_eq!(fort_worth.len(), 1);
        assert!((fort_worth[0].moving_average - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn by_category_splits_series() {
        let data = vec![
            Observation::new(32.78, -96.8, at(2024, 1, 1))
                .with_category("THEFT")
                .with_region("Dallas"),
            Observation::new(32.78, -96.8, at(2024, 1, 2))
                .with_category("ASSAULT")
                .with_region("Dallas"),
            Observation::new(32.78, -96.8, at(2024, 1, 3))
                .with_category("THEFT")
                .with_region("Dallas"),
        ];
        let regions = regions();
        let rows = TrendAggregator::new(&data, &regions)
            .moving_average(7, true)
            .unwrap();

        let theft: Vec<&MovingAverageRow> = rows
            .iter()
            .filter(|r| r.category.as_deref() == Some("THEFT"))
            .collect();
        assert_eq!(theft.len(), 3);
        assert!((theft[2].moving_average - 2.0 / 3.0).abs() < 1e-12);

        let assault: Vec<&MovingAverageRow> = rows
            .iter()
            .filter(|r| r.category.as_deref() == Some("ASSAULT"))
            .collect();
        assert_eq!(assault.len(), 1);
        assert!((assault[0].moving_average - 1.0).abs() < f64::EPSILON);
    }
}
