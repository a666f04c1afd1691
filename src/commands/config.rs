use crate::error::ConfigError;
use crate::models::region::{RegionId, RelativeRect};
use crate::services::config::ConfigManager;
use std::path::PathBuf;

/// Config manager for an explicit path, or the platform default
pub fn init_config_manager(path: Option<PathBuf>) -> Result<ConfigManager, ConfigError> {
    match path {
        Some(path) => Ok(ConfigManager::with_file(path)),
        None => ConfigManager::new(),
    }
}

/// Write the default configuration unless one exists (or `force`).
/// Returns whether a file was written.
pub fn init_config(manager: &ConfigManager, force: bool) -> Result<bool, ConfigError> {
    if manager.config_exists() && !force {
        return Ok(false);
    }
    manager.save(&crate::models::config::AppConfig::default())?;
    Ok(true)
}

/// Save a region's capture box to configuration
pub fn save_region_box(
    manager: &ConfigManager,
    region: &RegionId,
    capture_box: RelativeRect,
) -> Result<(), ConfigError> {
    if !capture_box.is_valid() {
        return Err(ConfigError::Invalid(format!(
            "capture box for {} must have right > left and bottom > top",
            region
        )));
    }

    let mut config = manager.load()?;
    let tuning = config
        .regions
        .get_mut(region)
        .ok_or_else(|| ConfigError::UnknownRegion(region.clone()))?;
    tuning.capture_box = capture_box;

    manager.save(&config)
}

/// Load a region's capture box from configuration
pub fn load_region_box(manager: &ConfigManager, region: &RegionId) -> Result<RelativeRect, ConfigError> {
    let config = manager.load()?;
    Ok(config.tuning(region)?.capture_box)
}
