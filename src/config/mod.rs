pub mod settings;

pub use settings::{
    Config, DebugLogRotation, ProviderSettings, RetrySettings, SearchLogSettings, SearchSettings,
};

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Failed to get config directory")?
        .join("seeker");

    // Create config directory if it doesn't exist
    fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

    Ok(config_dir.join("config.toml"))
}

/// Directory for the query log, honoring `search_log.dir`
pub fn search_log_dir(config: &Config) -> Result<PathBuf> {
    if let Some(dir) = config.search_log.dir.as_deref() {
        return Ok(PathBuf::from(dir));
    }
    Ok(dirs::data_dir()
        .context("Failed to get data directory")?
        .join("seeker")
        .join("logs"))
}

/// Load configuration from file, or create default if not exists
pub fn load_or_create_config() -> Result<Config> {
    let path = config_path()?;

    if path.exists() {
        load_from_path(&path)
    } else {
        let config = Config::default();
        save_config_to(&config, &path)?;

        eprintln!("Created default config at: {}", path.display());
        eprintln!("Set GROQ_API_KEY / XAI_API_KEY and SERPER_API_KEY, or edit this file.");

        Ok(config)
    }
}

/// Load configuration from an explicit path
pub fn load_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}

fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(path, content).context("Failed to write config file")?;
    Ok(())
}
