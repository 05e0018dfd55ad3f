//! Calendar-window counts and rates.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use risk_map_analytics_models::{MonthlyRate, TimeWindow, TimeWindowStat};

use crate::moving_average::trailing_means;
use crate::{TrendAggregator, rate_per_100k, rate_per_area};

/// Days per month used to turn a month count into a lookback.
const DAYS_PER_MONTH: i64 = 30;

/// Months averaged into [`MonthlyRate::moving_average_rate`].
const RATE_SMOOTHING_MONTHS: usize = 3;

impl TrendAggregator<'_> {
    /// Counts observations per (window, region), with per-capita and
    /// per-area rates.
    ///
    /// Rows are ordered by window start, then region. Only windows that
    /// contain at least one observation appear.
    #[must_use]
    pub fn time_window_stats(
        &self,
        window: TimeWindow,
        min: Option<DateTime<Utc>>,
        max: Option<DateTime<Utc>>,
    ) -> Vec<TimeWindowStat> {
        let mut buckets: BTreeMap<(NaiveDate, &str), BTreeMap<String, u64>> = BTreeMap::new();
        for obs in self.filtered(min, max) {
            let key = (window.start_of(obs.date()), obs.region_label());
            *buckets
                .entry(key)
                .or_default()
                .entry(obs.category_label().to_string())
                .or_default() += 1;
        }

        buckets
            .into_iter()
            .map(|((window_start, region), incidents_by_type)| {
                let total_incidents = incidents_by_type.values().sum();
                let reference = self.region(region);
                TimeWindowStat {
                    window_start,
                    region: region.to_string(),
                    total_incidents,
                    incidents_by_type,
                    rate_per_100k: rate_per_100k(total_incidents, reference),
                    rate_per_area: rate_per_area(total_incidents, reference),
                }
            })
            .collect()
    }

    /// Monthly per-100k rates over the last `months × 30` days before
    /// `now`, with a 3-month trailing average per region.
    ///
    /// Rows are ordered by region, then month.
    #[must_use]
    pub fn monthly_rates(&self, months: u32, now: DateTime<Utc>) -> Vec<MonthlyRate> {
        let start = now - Duration::days(i64::from(months) * DAYS_PER_MONTH);
        let stats = self.time_window_stats(TimeWindow::Month, Some(start), Some(now));

        let mut by_region: BTreeMap<String, Vec<TimeWindowStat>> = BTreeMap::new();
        for stat in stats {
            by_region.entry(stat.region.clone()).or_default().push(stat);
        }

        let mut rows = Vec::new();
        for (region, series) in by_region {
            let reference = self.region(&region);
            let rates: Vec<f64> = series.iter().map(|s| s.rate_per_100k).collect();
            let smoothed = trailing_means(&rates, RATE_SMOOTHING_MONTHS);

            for (stat, moving_average_rate) in series.into_iter().zip(smoothed) {
                let rates_by_type = stat
                    .incidents_by_type
                    .iter()
                    .map(|(label, count)| (label.clone(), rate_per_100k(*count, reference)))
                    .collect();
                rows.push(MonthlyRate {
                    month: stat.window_start,
                    region: region.clone(),
                    total_incidents: stat.total_incidents,
                    rate_per_100k: stat.rate_per_100k,
                    moving_average_rate,
                    rates_by_type,
                });
            }
        }

        log::debug!("Computed {} monthly rate rows over {months} months", rows.len());
        rows
    }
}

#[cfg(test)]
mod tests {
    use risk_map_analytics_models::RegionTable;
    use risk_map_observation_models::Observation;

    use super::*;
    use crate::test_support::{at, regions};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn observations() -> Vec<Observation> {
        vec![
            Observation::new(32.78, -96.80, at(2024, 3, 11))
                .with_category("THEFT")
                .with_region("Dallas"),
            Observation::new(32.78, -96.80, at(2024, 3, 13))
                .with_category("THEFT")
                .with_region("Dallas"),
            Observation::new(32.78, -96.80, at(2024, 3, 17))
                .with_category("ASSAULT")
                .with_region("Dallas"),
            Observation::new(32.75, -97.33, at(2024, 3, 18))
                .with_category("BURGLARY")
                .with_region("Fort Worth"),
            Observation::new(32.75, -97.33, at(2024, 4, 2)).with_region("Arlington"),
        ]
    }

    #[test]
    fn weekly_windows_group_by_region_and_type() {
        let data = observations();
        let regions = regions();
        let stats = TrendAggregator::new(&data, &regions).time_window_stats(
            TimeWindow::Week,
            None,
            None,
        );
        assert_eq!(stats.len(), 3);

        let first = &stats[0];
        assert_eq!(first.window_start, ymd(2024, 3, 11));
        assert_eq!(first.region, "Dallas");
        assert_eq!(first.total_incidents, 3);
        assert_eq!(first.incidents_by_type["THEFT"], 2);
        assert_eq!(first.incidents_by_type["ASSAULT"], 1);
        assert!((first.rate_per_100k - 3.0 * 100_000.0 / 1_304_000.0).abs() < 1e-9);
        assert!((first.rate_per_area - 3.0 / 383.0).abs() < 1e-9);

        assert_eq!(stats[1].window_start, ymd(2024, 3, 18));
        assert_eq!(stats[1].region, "Fort Worth");
    }

    #[test]
    fn unknown_region_gets_zero_rates() {
        let data = observations();
        let regions = regions();
        let stats = TrendAggregator::new(&data, &regions).time_window_stats(
            TimeWindow::Month,
            None,
            None,
        );
        let arlington = stats.iter().find(|s| s.region == "Arlington").unwrap();
        assert_eq!(arlington.total_incidents, 1);
        assert_eq!(arlington.incidents_by_type["OTHER"], 1);
        assert!(arlington.rate_per_100k.abs() < f64::EPSILON);
        assert!(arlington.rate_per_area.abs() < f64::EPSILON);
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let data = observations();
        let regions = regions();
        let stats = TrendAggregator::new(&data, &regions).time_window_stats(
            TimeWindow::Day,
            Some(at(2024, 3, 13)),
            Some(at(2024, 3, 17)),
        );
        let days: Vec<NaiveDate> = stats.iter().map(|s| s.window_start).collect();
        assert_eq!(days, vec![ymd(2024, 3, 13), ymd(2024, 3, 17)]);
    }

    #[test]
    fn empty_input_gives_no_rows() {
        let regions = RegionTable::new();
        assert!(
            TrendAggregator::new(&[], &regions)
                .time_window_stats(TimeWindow::Month, None, None)
                .is_empty()
        );
    }

    #[test]
    fn monthly_rates_smooth_over_three_months() {
        let mut data = Vec::new();
        for (month, count) in [(1, 2), (2, 4), (3, 6), (4, 8)] {
            for day in 0..count {
                data.push(
                    Observation::new(32.78, -96.80, at(2024, month, day + 1))
                        .with_category("THEFT")
                        .with_region("Dallas"),
                );
            }
        }
        let regions = regions();
        let rows = TrendAggregator::new(&data, &regions).monthly_rates(12, at(2024, 5, 1));
        assert_eq!(rows.len(), 4);

        let per = |n: f64| n * 100_000.0 / 1_304_000.0;
        assert!((rows[0].moving_average_rate - per(2.0)).abs() < 1e-9);
        assert!((rows[1].moving_average_rate - per(3.0)).abs() < 1e-9);
        assert!((rows[2].moving_average_rate - per(4.0)).abs() < 1e-9);
        assert!((rows[3].moving_average_rate - per(6.0)).abs() < 1e-9);
        assert!((rows[3].rates_by_type["THEFT"] - per(8.0)).abs() < 1e-9);
    }

    #[test]
    fn monthly_rates_respect_lookback() {
        let data = vec![
            Observation::new(32.78, -96.80, at(2023, 1, 15)).with_region("Dallas"),
            Observation::new(32.78, -96.80, at(2024, 4, 15)).with_region("Dallas"),
        ];
        let regions = regions();
        let rows = TrendAggregator::new(&data, &regions).monthly_rates(3, at(2024, 5, 1));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].month, ymd(2024, 4, 1));
    }
}
