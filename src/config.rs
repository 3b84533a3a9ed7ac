//! Run configuration read from a TOML file.
//!
//! Every field has a default, so an absent file or an empty table is valid.
//! Command line flags override what is loaded here.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    reading::{DataType, Frequency},
    session::StationSearch,
};

pub const DEFAULT_CONFIG_FILE: &str = ".cliflo.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub session: SessionConfig,
    pub store: StoreConfig,
    pub cache: CacheConfig,
    pub update: UpdateConfig,
    pub stations: StationsConfig,
    pub export: ExportConfig,
    pub costs: CostsConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub base_url: String,
    /// Upper bound on every page load.
    pub timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            base_url: "https://cliflo.niwa.co.nz".to_string(),
            timeout_secs: 360,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            path: home().join("cliflo.sqlite"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub folder: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            folder: home().join("cliflo-cache"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct UpdateConfig {
    pub data_type: DataType,
    pub frequency: Frequency,
    /// First year fetched.
    pub start_year: i32,
    /// First year not fetched.
    pub end_year: i32,
    pub csv_only: bool,
    pub refresh: bool,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        UpdateConfig {
            data_type: DataType::Rainfall,
            frequency: Frequency::Daily,
            start_year: 1988,
            end_year: 2018,
            csv_only: false,
            refresh: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StationsConfig {
    /// Saved station list. When unset the list is fetched from CliFlo.
    pub file: Option<PathBuf>,
    pub min_percent_complete: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

impl Default for StationsConfig {
    fn default() -> Self {
        let search = StationSearch::default();
        StationsConfig {
            file: None,
            min_percent_complete: 100.0,
            latitude: search.latitude,
            longitude: search.longitude,
            radius_km: search.radius_km,
        }
    }
}

impl StationsConfig {
    pub fn search(&self) -> StationSearch {
        StationSearch {
            latitude: self.latitude,
            longitude: self.longitude,
            radius_km: self.radius_km,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub folder: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig { folder: home() }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CostsConfig {
    /// Pricing table exported to CSV.
    pub pricing: PathBuf,
}

impl Default for CostsConfig {
    fn default() -> Self {
        CostsConfig {
            pricing: home().join("pricing.csv"),
        }
    }
}

impl Config {
    /// Reads `path`, or `~/.cliflo.toml` when it exists, or falls back to the
    /// defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = home().join(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Config::default());
                }
                default
            }
        };

        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config = Config::parse(&text).map_err(|source| ConfigError::Parse { path, source })?;
        config.validate()?;

        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.timeout_secs == 0 {
            return Err(invalid("session.timeout_secs", "must be positive"));
        }
        if self.update.start_year >= self.update.end_year {
            return Err(invalid(
                "update.end_year",
                format!(
                    "{} is not after start year {}",
                    self.update.end_year, self.update.start_year
                ),
            ));
        }
        if !(0.0..=100.0).contains(&self.stations.min_percent_complete) {
            return Err(invalid("stations.min_percent_complete", "must be within 0 to 100"));
        }
        if !(-90.0..=90.0).contains(&self.stations.latitude) {
            return Err(invalid("stations.latitude", "must be within -90 to 90"));
        }
        if self.stations.radius_km <= 0.0 {
            return Err(invalid("stations.radius_km", "must be positive"));
        }

        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

pub fn home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn should_default_empty_file() {
        let config = Config::parse("").unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.session.timeout_secs, 360);
        assert_eq!(config.stations.search(), StationSearch::default());
        config.validate().unwrap();
    }

    #[test]
    fn should_read_partial_sections() {
        let config = Config::parse(
            r#"
            [update]
            data_type = "sunshine_hours"
            start_year = 2000
            end_year = 2003

            [stations]
            min_percent_complete = 80.0
            "#,
        )
        .unwrap();

        assert_eq!(config.update.data_type, DataType::SunshineHours);
        assert_eq!(config.update.start_year, 2000);
        assert!(!config.update.csv_only);
        assert_eq!(config.stations.min_percent_complete, 80.0);
    }

    #[test]
    fn should_reject_unknown_fields() {
        assert!(Config::parse("[update]\nstart = 2000\n").is_err());
    }

    #[test]
    fn should_reject_inverted_years() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cliflo.toml");
        fs::write(&path, "[update]\nstart_year = 2010\nend_year = 2000\n").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "update.end_year", .. }));
    }

    #[test]
    fn should_report_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();

        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
