use crate::config::schema::OverwatchConfig;
use crate::error::{OverwatchError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "OVERWATCH_CONFIG";

/// Get the configuration file path based on platform
pub fn get_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return PathBuf::from(path);
    }

    dirs::config_dir()
        .map(|p| p.join("overwatch"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config.toml")
}

/// Load configuration from the default path, creating it if missing
pub fn load_config() -> Result<OverwatchConfig> {
    let config_path = get_config_path();

    if !config_path.exists() {
        tracing::info!(
            "Config file not found at {:?}, creating default",
            config_path
        );
        return init_config(&config_path);
    }

    load_config_from(&config_path)
}

/// Load configuration from an explicit file
pub fn load_config_from(path: &Path) -> Result<OverwatchConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        OverwatchError::Config(format!("Failed to read config from {:?}: {}", path, e))
    })?;

    let config: OverwatchConfig = toml::from_str(&content)?;

    tracing::info!("Loaded config from {:?}", path);
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &OverwatchConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            OverwatchError::Config(format!(
                "Failed to create config directory {:?}: {}",
                parent, e
            ))
        })?;
    }

    let content = toml::to_string_pretty(config)?;

    fs::write(path, content).map_err(|e| {
        OverwatchError::Config(format!("Failed to write config to {:?}: {}", path, e))
    })?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

/// Write the default configuration to `path`
pub fn init_config(path: &Path) -> Result<OverwatchConfig> {
    let config = OverwatchConfig::default();
    save_config(&config, path)?;
    Ok(config)
}
