#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the risk map.
//!
//! Maintains the rolling statistics store for one region profile, answers
//! location and heatmap queries against it, runs the trend aggregators over
//! an observation CSV, and renders interpolated traffic and density grids.
//! Query results are printed to stdout as JSON.

mod config;
mod grid;

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use risk_map_analytics::TrendAggregator;
use risk_map_analytics_models::TimeWindow;
use risk_map_geography_models::{LatLon, km_to_degrees};
use risk_map_observation::csv_source::load_observations;
use risk_map_observation_models::Observation;
use risk_map_spatial::SpatialScorer;
use risk_map_spatial::interpolate::{
    ColorScale, GridConfig, WeightedSample, density_samples, interpolate_grid, nearby_summary,
};
use risk_map_stats::RollingStatsStore;
use risk_map_stats_models::RiskQueryResult;
use serde::Serialize;

use crate::config::RiskMapConfig;
use crate::grid::{Surface, write_grid};

#[derive(Parser)]
#[command(name = "risk_map", about = "Location risk scoring and crime trend tool")]
struct Cli {
    /// Region profile (TOML). Defaults to the built-in Dallas-Fort Worth
    /// profile.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create (or validate) the statistics store for the profile
    Init,
    /// Fold a CSV of observations into the rolling statistics store
    Update {
        /// Observation CSV
        #[arg(long)]
        input: PathBuf,
    },
    /// Print the latest month's risk score for every anchor
    Heatmap {
        /// Print a `GeoJSON` `FeatureCollection` instead of a JSON array
        #[arg(long)]
        geojson: bool,
    },
    /// Print the latest month's anchors as overlay points with opacity
    Overlay,
    /// Risk score and trend for a location
    Location {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        /// Search radius in kilometres
        #[arg(long, default_value_t = 2.0)]
        radius_km: f64,
    },
    /// Anchors at or above a risk threshold
    HighRisk {
        #[arg(long, default_value_t = 0.7)]
        threshold: f64,
    },
    /// Incident counts and rates per calendar window and region
    Trends {
        #[arg(long)]
        input: PathBuf,
        /// day, week, or month
        #[arg(long, default_value = "month")]
        window: TimeWindow,
        /// First day to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Monthly per-capita rates with a three-month moving average
    MonthlyRates {
        #[arg(long)]
        input: PathBuf,
        /// Months to look back from today
        #[arg(long, default_value_t = 12)]
        months: u32,
    },
    /// Trailing moving average of daily counts
    MovingAverage {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value_t = 7)]
        days: usize,
        /// Average per category as well as per region
        #[arg(long)]
        by_category: bool,
    },
    /// Incident counts bucketed into fixed-size cells
    Hotspots {
        #[arg(long)]
        input: PathBuf,
        /// Cell size in degrees
        #[arg(long, default_value_t = 0.01)]
        cell_size: f64,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Interpolate weighted traffic counts onto a grid and write it as CSV
    Traffic {
        /// CSV with a `weight` column (AADT) and the road name in `category`
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        resolution: Option<u32>,
        /// min-max, double-log, or percentile-rank
        #[arg(long)]
        scale: Option<ColorScale>,
    },
    /// Interpolate incident density onto a grid and write it as CSV
    Density {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        resolution: Option<u32>,
        #[arg(long)]
        scale: Option<ColorScale>,
    },
    /// Summarize traffic counts near a location
    Nearby {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        #[arg(long, default_value_t = 1.0)]
        radius_km: f64,
    },
}

/// Output of the `location` command.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LocationReport {
    latitude: f64,
    longitude: f64,
    /// Interpolated score from the latest month's anchor scores.
    score: f64,
    /// Aggregated anchor statistics, absent when no anchor is in range.
    stats: Option<RiskQueryResult>,
}

/// Output of the `nearby` command.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NearbyReport {
    average_value: f64,
    max_value: f64,
    labels: Vec<String>,
    point_count: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    let config = RiskMapConfig::load(cli.config.as_deref())?;
    log::debug!("Using region profile {}", config.name);

    match cli.command {
        Commands::Init => {
            let store = open_store(&config)?;
            store.save()?;
            print_json(&store.metadata())?;
        }
        Commands::Update { input } => {
            let observations = load(&input, &config)?;
            let mut store = open_store(&config)?;
            let summary = store.update(&observations)?;
            log::info!(
                "Applied {} observations ({} outside the window), updated {} months, evicted {}",
                summary.applied,
                summary.ignored,
                summary.months_updated.len(),
                summary.months_evicted
            );
            if summary.rejected > 0 {
                log::warn!(
                    "{} observations had unusable coordinates or weights",
                    summary.rejected
                );
            }
            if summary.degenerate_months > 0 {
                log::warn!(
                    "{} months had uniform totals and kept their previous scores",
                    summary.degenerate_months
                );
            }
            print_json(&store.metadata())?;
        }
        Commands::Heatmap { geojson } => {
            let store = open_store(&config)?;
            if geojson {
                print_json(&store.heatmap_geojson())?;
            } else {
                print_json(&store.current_heatmap_snapshot())?;
            }
        }
        Commands::Overlay => print_json(&open_store(&config)?.density_overlay())?,
        Commands::Location {
            lat,
            lon,
            radius_km,
        } => {
            let store = open_store(&config)?;
            let scorer = SpatialScorer::from_store(&store)?;
            print_json(&LocationReport {
                latitude: lat,
                longitude: lon,
                score: scorer.score(LatLon::new(lat, lon)),
                stats: store.query_location(lat, lon, km_to_degrees(radius_km)),
            })?;
        }
        Commands::HighRisk { threshold } => {
            print_json(&open_store(&config)?.high_risk_areas(threshold))?;
        }
        Commands::Trends {
            input,
            window,
            from,
            to,
        } => {
            let observations = load(&input, &config)?;
            let aggregator = TrendAggregator::new(&observations, &config.regions);
            print_json(&aggregator.time_window_stats(
                window,
                from.map(start_of_day),
                to.map(end_of_day),
            ))?;
        }
        Commands::MonthlyRates { input, months } => {
            let observations = load(&input, &config)?;
            let aggregator = TrendAggregator::new(&observations, &config.regions);
            print_json(&aggregator.monthly_rates(months, Utc::now()))?;
        }
        Commands::MovingAverage {
            input,
            days,
            by_category,
        } => {
            let observations = load(&input, &config)?;
            let aggregator = TrendAggregator::new(&observations, &config.regions);
            print_json(&aggregator.moving_average(days, by_category)?)?;
        }
        Commands::Hotspots {
            input,
            cell_size,
            from,
            to,
        } => {
            let observations = load(&input, &config)?;
            let aggregator = TrendAggregator::new(&observations, &config.regions);
            print_json(&aggregator.hotspot_grid(
                cell_size,
                from.map(start_of_day),
                to.map(end_of_day),
            )?)?;
        }
        Commands::Traffic {
            input,
            output,
            resolution,
            scale,
        } => {
            let samples = traffic_samples(&input, &config)?;
            let grid = grid_config(GridConfig::traffic(), resolution, scale);
            write_grid(&output, Surface::Traffic, &interpolate_grid(&samples, &grid))?;
        }
        Commands::Density {
            input,
            output,
            resolution,
            scale,
        } => {
            let observations = load(&input, &config)?;
            let samples = density_samples(&observations);
            let grid = grid_config(GridConfig::density(), resolution, scale);
            write_grid(&output, Surface::Density, &interpolate_grid(&samples, &grid))?;
        }
        Commands::Nearby {
            input,
            lat,
            lon,
            radius_km,
        } => {
            let samples = traffic_samples(&input, &config)?;
            let summary = nearby_summary(
                &samples,
                LatLon::new(lat, lon),
                km_to_degrees(radius_km),
            )
            .map(|s| NearbyReport {
                average_value: s.average_value,
                max_value: s.max_value,
                labels: s.labels,
                point_count: s.point_count,
            });
            print_json(&summary)?;
        }
    }

    Ok(())
}

fn open_store(config: &RiskMapConfig) -> Result<RollingStatsStore, risk_map_stats::StatsError> {
    RollingStatsStore::initialize(&config.stats_path(), config.mesh())
}

fn load(
    path: &Path,
    config: &RiskMapConfig,
) -> Result<Vec<Observation>, risk_map_observation::ObservationError> {
    let (observations, report) = load_observations(path, &config.validity_bounds)?;
    if report.dropped > 0 {
        log::warn!(
            "Dropped {} of {} records from {}",
            report.dropped,
            report.total(),
            path.display()
        );
    }
    Ok(observations)
}

fn traffic_samples(
    path: &Path,
    config: &RiskMapConfig,
) -> Result<Vec<WeightedSample>, risk_map_observation::ObservationError> {
    let observations = load(path, config)?;
    let samples: Vec<WeightedSample> = observations
        .iter()
        .filter_map(WeightedSample::from_weighted_observation)
        .collect();
    if samples.len() < observations.len() {
        log::warn!(
            "{} records had no weight and were skipped",
            observations.len() - samples.len()
        );
    }
    Ok(samples)
}

const fn grid_config(
    mut grid: GridConfig,
    resolution: Option<u32>,
    scale: Option<ColorScale>,
) -> GridConfig {
    if let Some(resolution) = resolution {
        grid.resolution = resolution;
    }
    if let Some(scale) = scale {
        grid.scale = scale;
    }
    grid
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(23, 59, 59)
        .map_or_else(|| start_of_day(date), |dt| dt.and_utc())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
