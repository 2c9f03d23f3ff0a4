//! Profile management for Mascon Translator
//!
//! Handles saving and loading translator configurations as TOML files.

use crate::config::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Name of the profile that always exists.
pub const DEFAULT_PROFILE: &str = "Default";

/// Profile manager for saving/loading profiles
pub struct ProfileManager {
    /// Directory where profiles are stored
    profile_dir: PathBuf,
}

impl ProfileManager {
    /// Create a profile manager for the user's config directory
    pub fn new() -> Result<Self> {
        Self::with_directory(Self::get_profile_directory()?)
    }

    /// Create a profile manager rooted at `profile_dir`
    pub fn with_directory(profile_dir: impl Into<PathBuf>) -> Result<Self> {
        let profile_dir = profile_dir.into();

        // Create directory if it doesn't exist
        if !profile_dir.exists() {
            fs::create_dir_all(&profile_dir).context("Failed to create profile directory")?;
            info!("Created profile directory: {:?}", profile_dir);
        }

        Ok(Self { profile_dir })
    }

    /// Get the profile directory path
    fn get_profile_directory() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to find config directory")?;
        Ok(config_dir.join("mascon-translator").join("profiles"))
    }

    fn profile_path(&self, name: &str) -> PathBuf {
        self.profile_dir
            .join(format!("{}.toml", Self::sanitize_filename(name)))
    }

    pub fn profile_exists(&self, name: &str) -> bool {
        self.profile_path(name).exists()
    }

    /// Save a profile to disk
    pub fn save_profile(&self, config: &Config) -> Result<PathBuf> {
        let path = self.profile_path(&config.name);

        let toml_content = toml::to_string_pretty(config).context("Failed to serialize profile")?;

        fs::write(&path, toml_content).context("Failed to write profile file")?;

        info!("Saved profile '{}' to {:?}", config.name, path);
        Ok(path)
    }

    /// Load a profile from disk
    ///
    /// A missing Default profile yields the built-in defaults.
    pub fn load_profile(&self, name: &str) -> Result<Config> {
        let path = self.profile_path(name);

        if !path.exists() && name == DEFAULT_PROFILE {
            info!("No Default profile on disk, using built-in defaults");
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&path)
            .context(format!("Failed to read profile file: {:?}", path))?;

        let mut config: Config = toml::from_str(&content).context("Failed to parse profile")?;
        config
            .validate()
            .context(format!("Invalid profile {:?}", path))?;
        // The file name is authoritative.
        config.name = name.to_string();

        info!("Loaded profile '{}' from {:?}", config.name, path);
        Ok(config)
    }

    /// List all available profiles, Default first
    pub fn list_profiles(&self) -> Result<Vec<String>> {
        let mut profiles = Vec::new();

        if let Ok(entries) = fs::read_dir(&self.profile_dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(name) = path.file_stem() {
                        profiles.push(name.to_string_lossy().to_string());
                    }
                }
            }
        }

        profiles.retain(|p| p != DEFAULT_PROFILE);
        profiles.sort();
        profiles.insert(0, DEFAULT_PROFILE.to_string());
        Ok(profiles)
    }

    /// Delete a profile
    pub fn delete_profile(&self, name: &str) -> Result<()> {
        if name == DEFAULT_PROFILE {
            anyhow::bail!("The Default profile cannot be deleted");
        }
        let path = self.profile_path(name);

        fs::remove_file(&path).context(format!("Failed to delete profile: {:?}", path))?;

        info!("Deleted profile '{}'", name);
        Ok(())
    }

    /// Copy a profile to the first free `<name>_copy`, `<name>_copy2`, ... name
    pub fn duplicate_profile(&self, name: &str) -> Result<String> {
        let mut config = self.load_profile(name)?;
        let base = format!("{}_copy", Self::sanitize_filename(name));

        let mut candidate = base.clone();
        let mut n = 2;
        while self.profile_exists(&candidate) {
            candidate = format!("{}{}", base, n);
            n += 1;
        }

        config.name = candidate.clone();
        self.save_profile(&config)?;
        info!("Duplicated profile '{}' as '{}'", name, candidate);
        Ok(candidate)
    }

    /// Rename a profile
    pub fn rename_profile(&self, from: &str, to: &str) -> Result<()> {
        if from == DEFAULT_PROFILE {
            anyhow::bail!("The Default profile cannot be renamed");
        }
        let to = Self::sanitize_filename(to.trim());
        if to.is_empty() {
            anyhow::bail!("Profile name cannot be empty");
        }
        if self.profile_exists(&to) {
            anyhow::bail!("Profile '{}' already exists", to);
        }

        let mut config = self.load_profile(from)?;
        config.name = to.clone();
        self.save_profile(&config)?;
        fs::remove_file(self.profile_path(from))
            .context(format!("Failed to remove old profile '{}'", from))?;

        info!("Renamed profile '{}' to '{}'", from, to);
        Ok(())
    }

    /// Sanitize a profile name for use as a filename
    pub fn sanitize_filename(name: &str) -> String {
        name.chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect()
    }
}
