//! Application settings management
//!
//! Remembers which profile to run and which controller was used last.

use crate::profile::DEFAULT_PROFILE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Profile to load on startup (defaults to "Default")
    #[serde(default = "default_profile_name")]
    pub default_profile: String,

    /// Device node of the last controller used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_device: Option<PathBuf>,
}

fn default_profile_name() -> String {
    DEFAULT_PROFILE.to_string()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            default_profile: default_profile_name(),
            last_device: None,
        }
    }
}

impl AppSettings {
    /// Get the settings file path
    fn settings_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("mascon-translator");

        fs::create_dir_all(&config_dir)?;
        Ok(config_dir.join("settings.toml"))
    }

    /// Load settings from file (or create defaults)
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::settings_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let settings: AppSettings = toml::from_str(&content)
                .context(format!("Failed to parse settings file {:?}", path))?;
            info!("Loaded settings from {:?}", path);
            Ok(settings)
        } else {
            info!("No settings file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save settings to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::settings_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Set the default profile
    pub fn set_default_profile(&mut self, profile: &str) -> Result<()> {
        self.default_profile = profile.to_string();
        info!("Default profile set to: '{}'", profile);
        self.save()
    }

    /// Remember the controller in use, saving only when it changed
    pub fn remember_device(&mut self, path: &Path) -> Result<()> {
        if self.last_device.as_deref() == Some(path) {
            return Ok(());
        }
        self.last_device = Some(path.to_path_buf());
        self.save()
    }
}
