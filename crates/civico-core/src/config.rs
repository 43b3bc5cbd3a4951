//! Settings file loading

use crate::error::CoreError;
use civico_types::Settings;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the settings file inside the per-user config directory
pub const SETTINGS_FILE: &str = "settings.json";

/// `{config_dir}/civico-dl/settings.json`, if the platform has a config dir
pub fn default_settings_path(config_dir: Option<PathBuf>) -> Option<PathBuf> {
    config_dir.map(|dir| dir.join("civico-dl").join(SETTINGS_FILE))
}

/// Load settings from a JSON file. A missing file yields defaults; missing
/// fields take their default values.
pub fn load_settings(path: &Path) -> Result<Settings, CoreError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No settings file at {}, using defaults", path.display());
            return Ok(Settings::default());
        }
        Err(e) => return Err(e.into()),
    };

    let settings: Settings = serde_json::from_str(&raw)
        .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e)))?;
    validate(&settings)?;
    debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

fn validate(settings: &Settings) -> Result<(), CoreError> {
    if settings.chunk_size == 0 {
        return Err(CoreError::Config("chunk_size must be greater than 0".to_string()));
    }
    for (name, value) in [("api_base", &settings.api_base), ("vod_base", &settings.vod_base)] {
        url::Url::parse(value)
            .map_err(|e| CoreError::Config(format!("{} '{}' is not a URL: {}", name, value, e)))?;
    }
    Ok(())
}
