//! Report Configuration Module
//! Source URLs, target countries, and output location with serde defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Optional override file looked up in the working directory.
pub const CONFIG_FILE: &str = "epicurve.json";

const JHU_BASE: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config must list exactly two target countries, got {0}")]
    BadCountryCount(usize),
}

/// URLs of the three source CSV resources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceUrls {
    #[serde(default = "default_confirmed_url")]
    pub confirmed: String,
    #[serde(default = "default_deaths_url")]
    pub deaths: String,
    #[serde(default = "default_recovered_url")]
    pub recovered: String,
}

impl Default for SourceUrls {
    fn default() -> Self {
        Self {
            confirmed: default_confirmed_url(),
            deaths: default_deaths_url(),
            recovered: default_recovered_url(),
        }
    }
}

/// Run configuration. Every field has a default matching the published report,
/// so an absent config file means the standard Iceland/Malta run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub sources: SourceUrls,
    #[serde(default = "default_countries")]
    pub countries: Vec<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sources: SourceUrls::default(),
            countries: default_countries(),
            output_dir: default_output_dir(),
        }
    }
}

impl ReportConfig {
    /// Load from `epicurve.json` if present, otherwise use defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config: Self = if path.exists() {
            serde_json::from_str(&std::fs::read_to_string(path)?)?
        } else {
            Self::default()
        };
        if config.countries.len() != 2 {
            return Err(ConfigError::BadCountryCount(config.countries.len()));
        }
        Ok(config)
    }

    /// Title of the combined comparison chart, e.g. "Iceland and Malta Cases and Deaths".
    pub fn combined_title(&self) -> String {
        format!(
            "{} and {} Cases and Deaths",
            self.countries[0], self.countries[1]
        )
    }
}

fn default_confirmed_url() -> String {
    format!("{JHU_BASE}/time_series_covid19_confirmed_global.csv")
}

fn default_deaths_url() -> String {
    format!("{JHU_BASE}/time_series_covid19_deaths_global.csv")
}

fn default_recovered_url() -> String {
    format!("{JHU_BASE}/time_series_covid19_recovered_global.csv")
}

fn default_countries() -> Vec<String> {
    vec!["Iceland".to_string(), "Malta".to_string()]
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("report")
}
