//! Run configuration.
//!
//! Each setting resolves as command-line flag, then environment variable
//! (after `.env` has been loaded by the binary), then built-in default.

use anyhow::{Result, anyhow};
use std::path::PathBuf;

use crate::records::DuplicatePolicy;

pub const DATA_SOURCE_VAR: &str = "SFO_DATA_SOURCE";
pub const COORDINATES_SOURCE_VAR: &str = "SFO_COORDINATES_SOURCE";
pub const DUPLICATE_POLICY_VAR: &str = "SFO_DUPLICATE_POLICY";
pub const EXPORT_DIR_VAR: &str = "SFO_EXPORT_DIR";

pub const DEFAULT_DATA_SOURCE: &str = "Resources/sfo_neighborhoods_census_data.csv";
pub const DEFAULT_COORDINATES_SOURCE: &str = "Resources/neighborhoods_coordinates.csv";
pub const DEFAULT_EXPORT_DIR: &str = "output";

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Observation CSV: file path or `http(s)://` URL.
    pub data_source: String,
    /// Coordinate CSV: file path or `http(s)://` URL.
    pub coordinates_source: String,
    pub duplicate_policy: DuplicatePolicy,
    pub export_dir: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            data_source: DEFAULT_DATA_SOURCE.to_string(),
            coordinates_source: DEFAULT_COORDINATES_SOURCE.to_string(),
            duplicate_policy: DuplicatePolicy::default(),
            export_dir: PathBuf::from(DEFAULT_EXPORT_DIR),
        }
    }
}

/// Values given on the command line; `None` falls through to the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_source: Option<String>,
    pub coordinates_source: Option<String>,
    pub duplicate_policy: Option<DuplicatePolicy>,
    pub export_dir: Option<PathBuf>,
}

impl AnalysisConfig {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let duplicate_policy = match get(DUPLICATE_POLICY_VAR) {
            Some(raw) => raw
                .parse::<DuplicatePolicy>()
                .map_err(|e: String| anyhow!("{DUPLICATE_POLICY_VAR}: {e}"))?,
            None => defaults.duplicate_policy,
        };

        Ok(Self {
            data_source: get(DATA_SOURCE_VAR).unwrap_or(defaults.data_source),
            coordinates_source: get(COORDINATES_SOURCE_VAR).unwrap_or(defaults.coordinates_source),
            duplicate_policy,
            export_dir: get(EXPORT_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.export_dir),
        })
    }

    /// Applies command-line values on top of `self`.
    pub fn with_overrides(self, overrides: ConfigOverrides) -> Self {
        Self {
            data_source: overrides.data_source.unwrap_or(self.data_source),
            coordinates_source: overrides.coordinates_source.unwrap_or(self.coordinates_source),
            duplicate_policy: overrides.duplicate_policy.unwrap_or(self.duplicate_policy),
            export_dir: overrides.export_dir.unwrap_or(self.export_dir),
        }
    }
}
