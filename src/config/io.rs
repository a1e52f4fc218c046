use std::path::{Path, PathBuf};

use crate::app_dirs::{self, AppDirs};
use crate::fs_atomic::atomic_write;

use super::types::{AppSettings, ConfigError};

/// Default filename used to store the app configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolve the configuration file path, ensuring the parent directory exists.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dirs = AppDirs::resolve().map_err(map_app_dir_error)?;
    dirs.ensure_root().map_err(map_app_dir_error)?;
    Ok(dirs.config_file())
}

/// Load configuration from the app directory, returning defaults if missing.
pub fn load_or_default() -> Result<AppSettings, ConfigError> {
    load_from(&config_path()?)
}

/// Load settings from a specific TOML file; a missing file yields defaults.
pub fn load_from(path: &Path) -> Result<AppSettings, ConfigError> {
    if !path.exists() {
        return Ok(AppSettings::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<AppSettings>(&text)
        .map(AppSettings::normalized)
        .map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
}

/// Write the TOML settings file atomically to prevent partial writes on crash.
pub fn save_to_path(settings: &AppSettings, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let data = toml::to_string_pretty(settings).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    atomic_write(path, data.as_bytes()).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> ConfigError {
    match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            ConfigError::CreateDir { path, source }
        }
    }
}
