use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::defaults::*;

/// Errors that may occur while loading or saving app configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to create the config directory.
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        /// Directory path that failed to create.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to read a config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to write a config file.
    #[error("Failed to write {path}: {source}")]
    Write {
        /// Path that failed to write.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        /// TOML file path.
        path: PathBuf,
        /// TOML parse error.
        source: toml::de::Error,
    },
    /// Failed to serialize config to TOML.
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        /// TOML file path.
        path: PathBuf,
        /// TOML serialization error.
        source: toml::ser::Error,
    },
    /// No usable config directory found.
    #[error("No suitable config directory found")]
    NoConfigDir,
}

/// Top-level settings persisted to `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppSettings {
    /// Directory holding the artifact trio; defaults to `<app root>/artifacts`.
    #[serde(default)]
    pub artifacts_dir: Option<PathBuf>,
    #[serde(default)]
    pub training: TrainingSettings,
    #[serde(default)]
    pub inference: InferenceSettings,
}

/// Classifier fitting parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingSettings {
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
    /// Share of the corpus held out for per-epoch validation.
    #[serde(default = "default_validation_fraction")]
    pub validation_fraction: f32,
    /// Seed for the split, weight init and batch shuffling.
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_filters")]
    pub filters: usize,
    #[serde(default = "default_kernel_size")]
    pub kernel_size: usize,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
            validation_fraction: default_validation_fraction(),
            seed: default_seed(),
            filters: default_filters(),
            kernel_size: default_kernel_size(),
            pool_size: default_pool_size(),
        }
    }
}

/// Serving-side knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferenceSettings {
    /// Upload name the live-capture client uses for its recordings.
    #[serde(default = "default_live_capture_filename")]
    pub live_capture_filename: String,
    /// Upper bound on decode + feature extraction for one request.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Fixed seed for the synthetic path (unset = OS entropy).
    #[serde(default)]
    pub synthetic_seed: Option<u64>,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            live_capture_filename: default_live_capture_filename(),
            request_timeout_ms: default_request_timeout_ms(),
            synthetic_seed: None,
        }
    }
}

impl InferenceSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }
}

impl AppSettings {
    /// Configured artifacts directory, or `<app root>/artifacts`.
    pub fn resolved_artifacts_dir(&self) -> Result<PathBuf, crate::app_dirs::AppDirError> {
        match &self.artifacts_dir {
            Some(dir) => Ok(dir.clone()),
            None => crate::app_dirs::default_artifacts_dir(),
        }
    }

    /// Clamp values that would make training degenerate.
    pub fn normalized(mut self) -> Self {
        let training = &mut self.training;
        training.epochs = training.epochs.max(1);
        training.batch_size = training.batch_size.max(1);
        training.filters = training.filters.max(1);
        training.kernel_size = training.kernel_size.max(1);
        training.pool_size = training.pool_size.max(1);
        training.validation_fraction = training.validation_fraction.clamp(0.0, 0.9);
        if !training.learning_rate.is_finite() || training.learning_rate <= 0.0 {
            training.learning_rate = default_learning_rate();
        }
        self
    }
}
