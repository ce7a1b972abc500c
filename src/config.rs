use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::gbdt::BoosterParams;
use crate::logging::LogConfig;
use crate::training::SplitConfig;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application metadata
    pub metadata: ConfigMetadata,

    /// Where the serving side finds the model
    pub model: ModelSettings,

    /// Offline training settings
    pub training: TrainingSettings,

    /// Logging settings
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// Model artifact location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Path of the persisted exertion model
    pub artifact_path: PathBuf,
}

/// Training pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSettings {
    /// Root directory holding one folder per participant
    pub dataset_root: Option<PathBuf>,

    /// Seed shared by the train/test split and the booster
    pub seed: u64,

    /// Held-out fraction used for the MAE diagnostic
    pub test_fraction: f64,

    /// Show a progress bar while loading logs
    pub show_progress: bool,

    /// Write a JSON training report next to the artifact
    pub write_report: bool,

    /// Booster hyperparameters
    pub booster: BoosterParams,
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();

        AppConfig {
            metadata: ConfigMetadata {
                version: "1.0".to_string(),
                created_at: now,
                updated_at: now,
            },
            model: ModelSettings::default(),
            training: TrainingSettings::default(),
            logging: LogConfig::default(),
        }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        ModelSettings {
            artifact_path: PathBuf::from("./models/exertion_model.bin"),
        }
    }
}

impl Default for TrainingSettings {
    fn default() -> Self {
        TrainingSettings {
            dataset_root: None,
            seed: 42,
            test_fraction: 0.2,
            show_progress: false,
            write_report: true,
            booster: BoosterParams::default(),
        }
    }
}

impl TrainingSettings {
    pub fn split_config(&self) -> SplitConfig {
        SplitConfig {
            test_fraction: self.test_fraction,
            seed: self.seed,
        }
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content =
            toml::to_string_pretty(self).with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".repcoach")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(_) => {
                tracing::debug!("Config file not found, using defaults: {}", config_path.display());
                Self::default()
            }
        }
    }

    /// Save configuration to default location
    pub fn save_default(&mut self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to_file(config_path)
    }

    /// Read a single value by dotted key, for `repcoach config --get`
    pub fn get_value(&self, key: &str) -> Result<String> {
        let value = match key {
            "model.artifact_path" => self.model.artifact_path.display().to_string(),
            "training.dataset_root" => self
                .training
                .dataset_root
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            "training.seed" => self.training.seed.to_string(),
            "training.test_fraction" => self.training.test_fraction.to_string(),
            "training.show_progress" => self.training.show_progress.to_string(),
            "training.write_report" => self.training.write_report.to_string(),
            "logging.level" => self.logging.level.to_string(),
            "logging.format" => self.logging.format.as_str().to_string(),
            _ => anyhow::bail!("Unknown configuration key: {}", key),
        };
        Ok(value)
    }

    /// Set a single value by dotted key, for `repcoach config --set key=value`
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "model.artifact_path" => self.model.artifact_path = PathBuf::from(value),
            "training.dataset_root" => {
                self.training.dataset_root = (!value.is_empty()).then(|| PathBuf::from(value))
            }
            "training.seed" => {
                self.training.seed = value.parse().with_context(|| format!("Invalid seed: {}", value))?
            }
            "training.test_fraction" => {
                let fraction: f64 = value
                    .parse()
                    .with_context(|| format!("Invalid test fraction: {}", value))?;
                if !(0.0..1.0).contains(&fraction) {
                    anyhow::bail!("test_fraction must be in [0, 1), got {}", fraction);
                }
                self.training.test_fraction = fraction;
            }
            "training.show_progress" => {
                self.training.show_progress = value
                    .parse()
                    .with_context(|| format!("Invalid boolean: {}", value))?
            }
            "training.write_report" => {
                self.training.write_report = value
                    .parse()
                    .with_context(|| format!("Invalid boolean: {}", value))?
            }
            "logging.level" => {
                self.logging.level = value.parse().map_err(|e: String| anyhow::anyhow!(e))?
            }
            "logging.format" => {
                self.logging.format = value.parse().map_err(|e: String| anyhow::anyhow!(e))?
            }
            _ => anyhow::bail!("Unknown configuration key: {}", key),
        }
        self.metadata.updated_at = Utc::now();
        Ok(())
    }

    /// Keys accepted by [`AppConfig::get_value`] and [`AppConfig::set_value`]
    pub fn keys() -> &'static [&'static str] {
        &[
            "model.artifact_path",
            "training.dataset_root",
            "training.seed",
            "training.test_fraction",
            "training.show_progress",
            "training.write_report",
            "logging.level",
            "logging.format",
        ]
    }
}
