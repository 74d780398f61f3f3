//! Batch run settings persistence.
//!
//! This module handles loading and saving the experiment grid and simulator
//! invocation used by the batch driver.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use thiserror::Error;

use crate::chart::{DEFAULT_X_COLUMN, DEFAULT_Y_COLUMNS};

/// Errors that can occur while loading or saving settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read settings file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write settings file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Cross traffic competing with the CCFS flow
#[derive(
    AsRefStr,
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    Eq,
    Hash,
    PartialEq,
    Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrafficMix {
    Pure,
    Tcp,
    Udp,
}

impl TrafficMix {
    /// Extra simulator argument selecting this mix
    pub fn simulator_flag(self) -> Option<&'static str> {
        match self {
            TrafficMix::Pure => None,
            TrafficMix::Tcp => Some("--tcp=1"),
            TrafficMix::Udp => Some("--udp=1"),
        }
    }
}

/// How to invoke the simulator
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulatorSettings {
    /// Directory the simulator is run from
    pub workdir: PathBuf,
    /// Simulator launcher
    pub program: String,
    /// Scenario passed to `--run`
    pub scenario: String,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("."),
            program: "./waf".to_string(),
            scenario: "rmcat-example".to_string(),
        }
    }
}

/// Columns plotted for every run
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChartSettings {
    pub x_column: String,
    pub y_columns: Vec<String>,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            x_column: DEFAULT_X_COLUMN.to_string(),
            y_columns: DEFAULT_Y_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Batch experiment settings
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BatchSettings {
    /// Settings file version for migration support
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub simulator: SimulatorSettings,
    #[serde(default = "default_traffic")]
    pub traffic: Vec<TrafficMix>,
    #[serde(default = "default_bandwidths")]
    pub bandwidths_kbps: Vec<u32>,
    /// Where `.out`, `.csv` and `.svg` files are written
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    #[serde(default)]
    pub chart: ChartSettings,
    /// Also write the per-packet delay stream for every run
    #[serde(default)]
    pub packet_delays: bool,
}

fn default_version() -> u32 {
    1
}

fn default_traffic() -> Vec<TrafficMix> {
    vec![TrafficMix::Pure, TrafficMix::Tcp, TrafficMix::Udp]
}

fn default_bandwidths() -> Vec<u32> {
    vec![300, 500, 1000, 2000]
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("ccfs-results")
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            version: default_version(),
            simulator: SimulatorSettings::default(),
            traffic: default_traffic(),
            bandwidths_kbps: default_bandwidths(),
            results_dir: default_results_dir(),
            chart: ChartSettings::default(),
            packet_delays: false,
        }
    }
}

impl BatchSettings {
    /// Get the config directory path for ccfslog
    pub fn get_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ccfslog"))
    }

    /// Get the path to the settings JSON file
    pub fn get_settings_path() -> Option<PathBuf> {
        Self::get_config_dir().map(|p| p.join("batch.json"))
    }

    /// Load settings from the config directory, falling back to defaults
    pub fn load() -> Self {
        let path = match Self::get_settings_path() {
            Some(p) => p,
            None => return Self::default(),
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("{}; using default settings", e);
                Self::default()
            }
        }
    }

    /// Load settings from an explicit file
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save settings to the config directory
    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::get_settings_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)
    }

    /// Save settings to an explicit file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let write_error = |source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(write_error)
    }
}
