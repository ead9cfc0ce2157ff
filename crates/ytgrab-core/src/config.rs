use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

/// User-configurable paths for downloads and bundled binaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory downloaded artifacts land in. Created on first use.
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,
    /// Directory checked for yt-dlp/ffmpeg before falling back to PATH.
    #[serde(default = "default_bin_dir")]
    pub bin_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Format rows shown per page in the selection list.
    #[serde(default = "default_items_per_page")]
    pub items_per_page: usize,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            downloads_dir: default_downloads_dir(),
            bin_dir: default_bin_dir(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            items_per_page: default_items_per_page(),
        }
    }
}

fn default_downloads_dir() -> PathBuf {
    PathBuf::from("assets")
}

fn default_bin_dir() -> PathBuf {
    PathBuf::from("bin")
}

fn default_items_per_page() -> usize {
    5
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
