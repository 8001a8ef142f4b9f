use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

use crate::client::DEFAULT_SERVER_URL;

/// Environment variable that overrides the configured server URL
pub const SERVER_URL_ENV: &str = "CHATBOT_SERVER_URL";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub server_url: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    pub fn save_server_url(url: &str) -> Result<PathBuf> {
        let path = Self::get_config_path()?;
        let mut config = Self::load_from(&path).unwrap_or_else(|_| Self::new());
        config.server_url = Some(url.trim_end_matches('/').to_string());
        config.save_to(&path)?;
        Ok(path)
    }

    /// CLI flag wins, then the environment, then the file, then the built-in address
    pub fn resolve_server_url(&self, cli: Option<&str>, env: Option<String>) -> String {
        let url = cli
            .map(str::to_string)
            .or(env.filter(|v| !v.trim().is_empty()))
            .or_else(|| self.server_url.clone())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        url.trim_end_matches('/').to_string()
    }

    pub fn resolve_log_file(&self, cli: Option<PathBuf>) -> PathBuf {
        cli.or_else(|| self.log_file.clone())
            .unwrap_or_else(|| std::env::temp_dir().join("chatbot.log"))
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("chatbot").join("config.json"))
    }
}
