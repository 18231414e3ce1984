use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{Error, Result};

pub const DEFAULT_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Endpoints and transport settings for the weather API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub geocoding_url: String,
    pub forecast_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            geocoding_url: DEFAULT_GEOCODING_URL.to_string(),
            forecast_url: DEFAULT_FORECAST_URL.to_string(),
            timeout_secs: 20,
        }
    }
}

/// Where and how the classifier is trained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub city: String,
    pub country_code: Option<String>,
    pub past_days: u32,
    pub rain_threshold_mm: f64,
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            city: "Stockholm".to_string(),
            country_code: Some("SE".to_string()),
            past_days: 14,
            rain_threshold_mm: 0.1,
            test_fraction: 0.25,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictConfig {
    /// Trailing window fetched at inference time.
    pub past_days: u32,
    /// Number of most recent hours returned for display.
    pub recent_hours: usize,
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self {
            past_days: 2,
            recent_hours: 24,
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// model_path = "models/rain_next_hour_model.json"
///
/// [training]
/// city = "Stockholm"
/// country_code = "SE"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model_path: PathBuf,
    pub roc_curve_path: PathBuf,
    pub training: TrainingConfig,
    pub predict: PredictConfig,
    pub api: ApiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/rain_next_hour_model.json"),
            roc_curve_path: PathBuf::from("plots/roc_curve.png"),
            training: TrainingConfig::default(),
            predict: PredictConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

impl Config {
    /// Load config from the platform config directory, or defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, use defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        toml::from_str(&contents).map_err(|e| {
            Error::Config(format!("Failed to parse config file {}: {e}", path.display()))
        })
    }

    /// Save config to the platform config directory.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!(
                    "Failed to create config directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let toml = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize configuration to TOML: {e}")))?;

        fs::write(path, toml).map_err(|e| {
            Error::Config(format!("Failed to write config file {}: {e}", path.display()))
        })
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "rain-next-hour", "rain-cli").ok_or_else(|| {
            Error::Config("Could not determine platform config directory".to_string())
        })?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Replace the training location. A blank country code clears the filter.
    pub fn set_training_location(&mut self, city: String, country_code: Option<String>) {
        self.training.city = city;
        self.training.country_code = normalize_country_code(country_code);
    }
}

/// Trim and upper-case a country code; blank input means "no filter".
pub fn normalize_country_code(code: Option<String>) -> Option<String> {
    let code = code?.trim().to_uppercase();
    (!code.is_empty()).then_some(code)
}
