//! Settings management for sshw
//!
//! Profiles live in their own store (see [`crate::profile`]); this module
//! covers the TOML settings file that tunes connection behavior.

mod settings;
pub mod serde_utils;

pub use settings::Settings;

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sshw")
}

/// Get the default settings file path
pub fn default_settings_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Load settings from a file
///
/// Zero durations are replaced by their defaults.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let settings: Settings = toml::from_str(&content)?;
    Ok(settings.normalized())
}

/// Load settings from the default path, falling back to defaults
///
/// A missing file is normal; an unreadable one is logged and ignored.
pub fn load_settings_or_default() -> Settings {
    let path = default_settings_path();
    if !path.exists() {
        tracing::debug!("No settings file at {:?}, using defaults", path);
        return Settings::default();
    }
    load_settings(&path).unwrap_or_else(|e| {
        tracing::warn!("Failed to load settings from {:?}: {}", path, e);
        Settings::default()
    })
}
