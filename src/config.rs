//! Configuration for the skyband catalog pipeline.
//!
//! All tunables the original tooling kept as module-level constants live here
//! as explicit values: catalog location, throttle, filter limits, band
//! geometry, and photometric coefficients.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::photometry::PhotometryConfig;

/// Configuration for the remote catalog archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// URL of the HTTP directory holding the catalog partitions.
    #[serde(default = "default_catalog_url")]
    pub url: String,
    /// File extension the listing is filtered on.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Optional sustained-bandwidth cap in bytes per second.
    #[serde(default)]
    pub throttle_bytes_per_sec: Option<u64>,
    /// Connect/read timeout for catalog requests, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_catalog_url() -> String {
    "http://cdn.gea.esac.esa.int/Gaia/gedr3/gaia_source".to_string()
}

fn default_extension() -> String {
    "gz".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: default_catalog_url(),
            extension: default_extension(),
            throttle_bytes_per_sec: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Configuration for the partition reducer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReduceConfig {
    /// Faintest primary brightness retained (Vmag).
    #[serde(default = "default_mag_limit")]
    pub mag_limit: f64,
    /// Southernmost declination retained, exclusive (degrees).
    #[serde(default = "default_dec_floor")]
    pub dec_floor: f64,
    /// Reuse an already-downloaded raw partition and keep it afterwards.
    #[serde(default = "default_use_existing")]
    pub use_existing: bool,
    /// Process only the first partition (testing aid).
    #[serde(default)]
    pub test_one: bool,
}

fn default_mag_limit() -> f64 {
    18.0
}

fn default_dec_floor() -> f64 {
    -40.0
}

fn default_use_existing() -> bool {
    true
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self {
            mag_limit: default_mag_limit(),
            dec_floor: default_dec_floor(),
            use_existing: default_use_existing(),
            test_one: false,
        }
    }
}

/// Geometry of the declination band files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandConfig {
    /// Lower edge of the southernmost band (degrees, inclusive).
    #[serde(default = "default_dec_min")]
    pub dec_min: f64,
    /// Upper edge of the northernmost band (degrees, exclusive).
    #[serde(default = "default_dec_max")]
    pub dec_max: f64,
    /// Width of each band (degrees).
    #[serde(default = "default_band_width")]
    pub width: f64,
}

fn default_dec_min() -> f64 {
    -40.0
}

fn default_dec_max() -> f64 {
    90.0
}

fn default_band_width() -> f64 {
    10.0
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            dec_min: default_dec_min(),
            dec_max: default_dec_max(),
            width: default_band_width(),
        }
    }
}

/// Main configuration for skyband.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Remote catalog archive settings.
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Directory holding raw partitions, reduced partitions, and band files.
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
    /// Reducer settings.
    #[serde(default)]
    pub reduce: ReduceConfig,
    /// Band geometry.
    #[serde(default)]
    pub bands: BandConfig,
    /// Photometric conversion coefficients.
    #[serde(default)]
    pub photometry: PhotometryConfig,
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig::default(),
            working_dir: default_working_dir(),
            reduce: ReduceConfig::default(),
            bands: BandConfig::default(),
            photometry: PhotometryConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile { source })?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config =
            serde_yaml::from_str(contents).map_err(|source| ConfigError::YamlParse { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog.url.is_empty() {
            return Err(ConfigError::EmptyCatalogUrl);
        }
        if self.bands.dec_min >= self.bands.dec_max {
            return Err(ConfigError::InvalidBandRange {
                min: self.bands.dec_min,
                max: self.bands.dec_max,
            });
        }
        if self.bands.width <= 0.0 {
            return Err(ConfigError::InvalidBandWidth {
                width: self.bands.width,
            });
        }
        // Band file names round edges to whole degrees, so sub-degree
        // geometries can map two bands onto one file.
        let bands = crate::bands::declination_bands(&self.bands);
        let mut names: Vec<String> = bands.iter().map(|b| b.file_name()).collect();
        names.sort_unstable();
        names.dedup();
        if names.len() != bands.len() {
            return Err(ConfigError::AmbiguousBandNames {
                width: self.bands.width,
            });
        }
        self.photometry.validate()?;
        Ok(())
    }
}
