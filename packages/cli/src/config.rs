//! Region profile loading.
//!
//! The Dallas-Fort Worth profile is compiled into the binary. A different
//! profile can be supplied with `--config`, and `RISK_MAP_DATA_DIR`
//! overrides the data directory of whichever profile is loaded.

use std::path::{Path, PathBuf};

use risk_map_analytics_models::RegionTable;
use risk_map_geography_models::BoundingBox;
use risk_map_spatial::DEFAULT_BUFFER_FRACTION;
use risk_map_stats::MeshSpec;
use serde::Deserialize;

/// Compiled-in default profile.
const DEFAULT_PROFILE: &str = include_str!("../config/dfw.toml");

/// Environment variable that overrides [`RiskMapConfig::data_dir`].
pub const DATA_DIR_ENV: &str = "RISK_MAP_DATA_DIR";

/// Errors that can occur while loading a region profile.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The profile file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The profile is not valid TOML for [`RiskMapConfig`].
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The profile parsed but describes an unusable region.
    #[error("Invalid profile: {0}")]
    Invalid(String),
}

/// One region profile: where data lives, which records to accept, and the
/// mesh the statistics store is built on.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskMapConfig {
    /// Display name of the region.
    pub name: String,
    /// Directory holding the persisted statistics store.
    pub data_dir: PathBuf,
    /// Anchors per side of the mesh.
    pub resolution: u32,
    /// Fraction of each span added on every side of the mesh bounds.
    #[serde(default = "default_buffer_fraction")]
    pub buffer_fraction: f64,
    /// Records outside these bounds are dropped at ingestion.
    pub validity_bounds: BoundingBox,
    /// Target area of the anchor mesh.
    pub mesh_bounds: BoundingBox,
    /// Population and area per region label.
    #[serde(default)]
    pub regions: RegionTable,
}

const fn default_buffer_fraction() -> f64 {
    DEFAULT_BUFFER_FRACTION
}

impl RiskMapConfig {
    /// Loads the profile at `path`, or the compiled-in default, then applies
    /// the data directory override from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or the
    /// profile fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                log::info!("Loading region profile from {}", path.display());
                Self::parse(&std::fs::read_to_string(path)?)?
            }
            None => Self::parse(DEFAULT_PROFILE)?,
        };

        if let Ok(dir) = std::env::var(DATA_DIR_ENV)
            && !dir.is_empty()
        {
            log::debug!("Using data directory {dir} from {DATA_DIR_ENV}");
            config.data_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    /// Parses and validates a profile from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the text is not a valid profile.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::de::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.validity_bounds.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "validity bounds are empty or non-finite: {:?}",
                self.validity_bounds
            )));
        }
        if !self.mesh_bounds.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "mesh bounds are empty or non-finite: {:?}",
                self.mesh_bounds
            )));
        }
        if self.resolution == 0 {
            return Err(ConfigError::Invalid("resolution must be at least 1".to_string()));
        }
        if !self.buffer_fraction.is_finite() || self.buffer_fraction < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "buffer fraction must be a non-negative number, got {}",
                self.buffer_fraction
            )));
        }
        Ok(())
    }

    /// Mesh the statistics store is built on.
    #[must_use]
    pub const fn mesh(&self) -> MeshSpec {
        MeshSpec {
            bounds: self.mesh_bounds,
            resolution: self.resolution,
            buffer_fraction: self.buffer_fraction,
        }
    }

    /// Path of the persisted statistics table.
    #[must_use]
    pub fn stats_path(&self) -> PathBuf {
        risk_map_stats::paths::stats_path(&self.data_dir)
    }
}
