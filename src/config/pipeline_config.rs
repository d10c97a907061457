//! Pipeline Configuration - operator-tunable TOML values
//!
//! Each struct implements `Default` with values from [`super::defaults`], so a
//! missing file or a partial file behaves exactly like the built-in settings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one PipeGuard deployment.
///
/// Load with `PipelineConfig::load()` which searches:
/// 1. `$PIPEGUARD_CONFIG` env var
/// 2. `./pipeguard.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Model artifact locations
    #[serde(default)]
    pub models: ModelConfig,

    /// Classifier decision and execution settings
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Physics fallback estimator
    #[serde(default)]
    pub fallback: FallbackConfig,

    /// Rule-based screening thresholds (inspect breakdown)
    #[serde(default)]
    pub screening: ScreeningConfig,

    /// Tabular input format
    #[serde(default)]
    pub dataset: DatasetConfig,
}

impl PipelineConfig {
    /// Load configuration using the standard search order:
    /// 1. `$PIPEGUARD_CONFIG` environment variable
    /// 2. `./pipeguard.toml` in the current working directory
    /// 3. Built-in defaults
    ///
    /// A config file that exists but fails to parse or validate is an error.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                let config = Self::load_from_file(&p)?;
                info!(path = %p.display(), "Loaded config from {}", defaults::CONFIG_ENV_VAR);
                return Ok(config);
            }
            warn!(path = %path, "{} points to non-existent file, falling back", defaults::CONFIG_ENV_VAR);
        }

        let local = PathBuf::from(defaults::LOCAL_CONFIG_FILE);
        if local.exists() {
            let config = Self::load_from_file(&local)?;
            info!("Loaded config from ./{}", defaults::LOCAL_CONFIG_FILE);
            return Ok(config);
        }

        info!("No {} found, using built-in defaults", defaults::LOCAL_CONFIG_FILE);
        Ok(Self::default())
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Full path of the classifier artifact.
    pub fn classifier_path(&self) -> PathBuf {
        self.models.dir.join(&self.models.classifier_file)
    }

    /// Full path of the regressor artifact.
    pub fn regressor_path(&self) -> PathBuf {
        self.models.dir.join(&self.models.regressor_file)
    }

    /// Validate cross-field invariants. Collects every violation before
    /// returning so the operator can fix the file in one pass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let threshold = self.inference.decision_threshold;
        if !threshold.is_finite() || !(0.0..1.0).contains(&threshold) {
            errors.push(format!(
                "inference.decision_threshold must be in [0, 1), got {threshold}"
            ));
        }

        if self.fallback.min_acoustic_sensors < 2 {
            errors.push(format!(
                "fallback.min_acoustic_sensors must be >= 2, got {}",
                self.fallback.min_acoustic_sensors
            ));
        }

        let s = &self.screening;
        if !s.acoustic_threshold_v.is_finite() || s.acoustic_threshold_v < 0.0 {
            errors.push(format!(
                "screening.acoustic_threshold_v must be a finite value >= 0, got {}",
                s.acoustic_threshold_v
            ));
        }
        if !s.pressure_drop_factor.is_finite() || s.pressure_drop_factor <= 0.0 {
            errors.push(format!(
                "screening.pressure_drop_factor must be a finite value > 0, got {}",
                s.pressure_drop_factor
            ));
        }

        if self.models.classifier_file.as_os_str().is_empty() {
            errors.push("models.classifier_file must not be empty".to_string());
        }
        if self.models.regressor_file.as_os_str().is_empty() {
            errors.push("models.regressor_file must not be empty".to_string());
        }

        if !self.dataset.delimiter.is_ascii() {
            errors.push(format!(
                "dataset.delimiter must be a single ASCII character, got {:?}",
                self.dataset.delimiter
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, std::io::Error),

    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(toml::ser::Error),

    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Models
// ============================================================================

/// Where the classifier and regressor artifacts live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Directory holding both artifacts.
    #[serde(default = "default_model_dir")]
    pub dir: PathBuf,

    /// Classifier artifact file name, relative to `dir`.
    #[serde(default = "default_classifier_file")]
    pub classifier_file: PathBuf,

    /// Regressor artifact file name, relative to `dir`.
    #[serde(default = "default_regressor_file")]
    pub regressor_file: PathBuf,
}

fn default_model_dir() -> PathBuf { PathBuf::from(defaults::MODEL_DIR) }
fn default_classifier_file() -> PathBuf { PathBuf::from(defaults::CLASSIFIER_FILE) }
fn default_regressor_file() -> PathBuf { PathBuf::from(defaults::REGRESSOR_FILE) }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dir: default_model_dir(),
            classifier_file: default_classifier_file(),
            regressor_file: default_regressor_file(),
        }
    }
}

// ============================================================================
// Inference
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Leak probability strictly above this labels the row a leak.
    #[serde(default = "default_decision_threshold")]
    pub decision_threshold: f64,

    /// Run rows on the rayon pool. Output order is unchanged.
    #[serde(default)]
    pub parallel: bool,
}

fn default_decision_threshold() -> f64 { defaults::DECISION_THRESHOLD }

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            decision_threshold: default_decision_threshold(),
            parallel: false,
        }
    }
}

// ============================================================================
// Fallback Estimator
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Fewest acoustic sensors with a usable coordinate before a centroid
    /// is attempted.
    #[serde(default = "default_min_acoustic_sensors")]
    pub min_acoustic_sensors: usize,
}

fn default_min_acoustic_sensors() -> usize { defaults::MIN_ACOUSTIC_SENSORS }

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            min_acoustic_sensors: default_min_acoustic_sensors(),
        }
    }
}

// ============================================================================
// Screening
// ============================================================================

/// Thresholds for the rule-based physics screen shown by `inspect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningConfig {
    /// Peak acoustic amplitude (V) the rule requires.
    #[serde(default = "default_acoustic_threshold")]
    pub acoustic_threshold_v: f64,

    /// Required ratio of local to baseline pressure drop.
    #[serde(default = "default_pressure_drop_factor")]
    pub pressure_drop_factor: f64,
}

fn default_acoustic_threshold() -> f64 { defaults::SCREEN_ACOUSTIC_THRESHOLD_V }
fn default_pressure_drop_factor() -> f64 { defaults::SCREEN_PRESSURE_DROP_FACTOR }

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            acoustic_threshold_v: default_acoustic_threshold(),
            pressure_drop_factor: default_pressure_drop_factor(),
        }
    }
}

// ============================================================================
// Dataset
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Field delimiter of the input file.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_delimiter() -> char { ',' }

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
        }
    }
}

impl DatasetConfig {
    /// Delimiter as the single byte the csv reader expects. Non-ASCII
    /// (rejected by `validate()`) falls back to a comma.
    pub fn delimiter_byte(&self) -> u8 {
        if self.delimiter.is_ascii() {
            self.delimiter as u8
        } else {
            b','
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.classifier_path(), PathBuf::from("models/leak_detector.json"));
        assert_eq!(config.regressor_path(), PathBuf::from("models/leak_locator.json"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
            [models]
            dir = "/opt/pipeguard/models"

            [inference]
            parallel = true
            "#,
        )
        .expect("partial config should parse");

        assert_eq!(config.models.dir, PathBuf::from("/opt/pipeguard/models"));
        assert_eq!(config.models.classifier_file, PathBuf::from(defaults::CLASSIFIER_FILE));
        assert!(config.inference.parallel);
        assert!((config.inference.decision_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.fallback.min_acoustic_sensors, 2);
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = PipelineConfig::default();
        config.inference.decision_threshold = 1.5;
        config.fallback.min_acoustic_sensors = 1;
        config.screening.pressure_drop_factor = 0.0;

        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 3, "errors: {errors:?}");
                assert!(errors[0].contains("decision_threshold"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_nan_threshold_rejected() {
        let mut config = PipelineConfig::default();
        config.inference.decision_threshold = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pipeguard.toml");

        let mut config = PipelineConfig::default();
        config.dataset.delimiter = ';';
        config.screening.acoustic_threshold_v = 0.35;
        std::fs::write(&path, config.to_toml().expect("serialize")).expect("write");

        let loaded = PipelineConfig::load_from_file(&path).expect("load");
        assert_eq!(loaded.dataset.delimiter_byte(), b';');
        assert!((loaded.screening.acoustic_threshold_v - 0.35).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pipeguard.toml");
        std::fs::write(&path, "[inference]\ndecision_threshold = \"high\"\n").expect("write");

        assert!(matches!(
            PipelineConfig::load_from_file(&path),
            Err(ConfigError::Parse(_, _))
        ));
    }
}
