//! The `.sermo` application directory and what lives in it.
//!
//! ```text
//! <base>/.sermo/
//!     config.toml
//!     logs/
//!     artifacts/
//! ```
//!
//! `<base>` is the OS config directory unless `SERMO_CONFIG_HOME` names another one.

use std::path::{Path, PathBuf};

use directories::BaseDirs;
use thiserror::Error;

pub const APP_DIR_NAME: &str = ".sermo";
/// Environment variable that replaces the OS config directory as `<base>`.
pub const CONFIG_HOME_ENV: &str = "SERMO_CONFIG_HOME";

const CONFIG_FILE_NAME: &str = "config.toml";
const LOGS_DIR_NAME: &str = "logs";
const ARTIFACTS_DIR_NAME: &str = "artifacts";

#[derive(Debug, Error)]
pub enum AppDirError {
    #[error("No suitable base config directory available for application files")]
    NoBaseDir,
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Resolved layout of the application directory. Nothing is created until asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDirs {
    root: PathBuf,
}

impl AppDirs {
    /// Layout under `SERMO_CONFIG_HOME`, falling back to the OS config directory.
    pub fn resolve() -> Result<Self, AppDirError> {
        let base = match std::env::var_os(CONFIG_HOME_ENV) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => BaseDirs::new()
                .map(|dirs| dirs.config_dir().to_path_buf())
                .ok_or(AppDirError::NoBaseDir)?,
        };
        Ok(Self::at(base))
    }

    /// Layout under an explicit `<base>`.
    pub fn at(base: impl AsRef<Path>) -> Self {
        Self {
            root: base.as_ref().join(APP_DIR_NAME),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    pub fn ensure_root(&self) -> Result<PathBuf, AppDirError> {
        ensure_dir(self.root.clone())
    }

    pub fn ensure_logs(&self) -> Result<PathBuf, AppDirError> {
        ensure_dir(self.root.join(LOGS_DIR_NAME))
    }

    pub fn ensure_artifacts(&self) -> Result<PathBuf, AppDirError> {
        ensure_dir(self.root.join(ARTIFACTS_DIR_NAME))
    }
}

/// The `.sermo` root, created if needed.
pub fn app_root_dir() -> Result<PathBuf, AppDirError> {
    AppDirs::resolve()?.ensure_root()
}

pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    AppDirs::resolve()?.ensure_logs()
}

/// Where the classifier/scaler/label-encoding trio lives unless configured otherwise.
pub fn default_artifacts_dir() -> Result<PathBuf, AppDirError> {
    AppDirs::resolve()?.ensure_artifacts()
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf, AppDirError> {
    std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
