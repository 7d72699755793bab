// src/core/settings.rs

//! Loading of `defreg.toml`, the per-registry settings file.

use crate::constants::SETTINGS_FILENAME;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse settings: {0}")]
    TomlDeserialize(#[from] toml::de::Error),
    #[error("Failed to serialize settings: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Invalid pool settings: {0}")]
    InvalidPool(String),
}

/// What the pool does when every worker is busy and the queue is full.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SaturationPolicy {
    /// Refuse the submission with an error.
    #[default]
    Reject,
    /// Run the task on the submitting thread.
    CallerRuns,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PoolSettings {
    pub core_size: usize,
    pub max_size: usize,
    pub keep_alive_secs: u64,
    #[serde(default)]
    pub saturation: SaturationPolicy,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            core_size: 2,
            max_size: 4,
            keep_alive_secs: 60,
            saturation: SaturationPolicy::Reject,
        }
    }
}

impl PoolSettings {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.max_size == 0 {
            return Err(SettingsError::InvalidPool("max_size must be at least 1".into()));
        }
        if self.core_size > self.max_size {
            return Err(SettingsError::InvalidPool(format!(
                "core_size ({}) exceeds max_size ({})",
                self.core_size, self.max_size
            )));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub pool: PoolSettings,
}

/// Loads `<base_dir>/defreg.toml`, writing the defaults first if it does not exist.
pub fn load_settings(base_dir: &Path) -> Result<Settings, SettingsError> {
    let path = base_dir.join(SETTINGS_FILENAME);
    let settings = if path.exists() {
        let content = fs::read_to_string(&path)?;
        toml::from_str(&content)?
    } else {
        log::debug!("Writing default settings to '{}'", path.display());
        let defaults = Settings::default();
        fs::write(&path, toml::to_string_pretty(&defaults)?)?;
        defaults
    };
    settings.pool.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_written_with_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = load_settings(dir.path()).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(dir.path().join(SETTINGS_FILENAME).is_file());
        // The written file loads back identically.
        assert_eq!(load_settings(dir.path()).unwrap(), settings);
    }

    #[test]
    fn test_custom_pool_settings() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILENAME),
            "[pool]\ncore_size = 1\nmax_size = 8\nkeep_alive_secs = 5\nsaturation = \"caller-runs\"\n",
        )
        .unwrap();
        let settings = load_settings(dir.path()).unwrap();
        assert_eq!(settings.pool.max_size, 8);
        assert_eq!(settings.pool.keep_alive(), Duration::from_secs(5));
        assert_eq!(settings.pool.saturation, SaturationPolicy::CallerRuns);
    }

    #[test]
    fn test_core_larger_than_max_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILENAME),
            "[pool]\ncore_size = 5\nmax_size = 2\nkeep_alive_secs = 5\n",
        )
        .unwrap();
        assert!(matches!(
            load_settings(dir.path()),
            Err(SettingsError::InvalidPool(_))
        ));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(SETTINGS_FILENAME), "[pool]\ncores = 5\n").unwrap();
        assert!(matches!(
            load_settings(dir.path()),
            Err(SettingsError::TomlDeserialize(_))
        ));
    }
}
