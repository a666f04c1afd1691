use crate::error::ConfigError;
use crate::models::config::AppConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Configuration manager for app settings
pub struct ConfigManager {
    config_dir: PathBuf,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Manager for the platform config file,
    /// `<config dir>/armament-helper/config.json`
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join("armament-helper");
        Ok(Self::with_dir(config_dir))
    }

    /// Manager for an explicit config file path
    pub fn with_file<P: AsRef<Path>>(path: P) -> Self {
        let config_path = path.as_ref().to_path_buf();
        let config_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            config_dir,
            config_path,
        }
    }

    fn with_dir(config_dir: PathBuf) -> Self {
        Self {
            config_path: config_dir.join("config.json"),
            config_dir,
        }
    }

    /// Save configuration to disk
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        if !self.config_dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.config_dir).map_err(|source| ConfigError::Io {
                path: self.config_dir.clone(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(config).map_err(|source| ConfigError::Parse {
            path: self.config_path.clone(),
            source,
        })?;

        fs::write(&self.config_path, json).map_err(|source| ConfigError::Io {
            path: self.config_path.clone(),
            source,
        })?;

        info!(path = %self.config_path.display(), "configuration saved");
        Ok(())
    }

    /// Load and validate configuration from disk
    ///
    /// If config file doesn't exist, returns default configuration
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.config_exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_path).map_err(|source| ConfigError::Io {
            path: self.config_path.clone(),
            source,
        })?;

        let config: AppConfig = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: self.config_path.clone(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the config file path
    pub fn config_file_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Check if config file exists
    pub fn config_exists(&self) -> bool {
        self.config_path.exists()
    }
}
