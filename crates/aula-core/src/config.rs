//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the auth server URL and the last username that logged in.
//!
//! Configuration is stored at `~/.config/aula/config.json`. The
//! `AULA_API_URL` and `AULA_USERNAME` environment variables take precedence
//! over the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_API_BASE_URL;

/// Application name used for config/data directory paths
const APP_NAME: &str = "aula";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Subdirectory of the data dir playing the role of local storage
const STORAGE_DIR: &str = "storage";

/// Subdirectory of the data dir holding log files
const LOG_DIR: &str = "logs";

pub const API_URL_ENV: &str = "AULA_API_URL";
pub const USERNAME_ENV: &str = "AULA_USERNAME";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_username: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Location of the user's config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    fn data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find local data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Directory backing the application's local storage
    pub fn storage_dir(&self) -> Result<PathBuf> {
        Ok(Self::data_dir()?.join(STORAGE_DIR))
    }

    pub fn log_dir(&self) -> Result<PathBuf> {
        Ok(Self::data_dir()?.join(LOG_DIR))
    }

    /// Auth server base URL: environment, then file, then the default
    pub fn api_base_url(&self) -> String {
        Self::resolve(std::env::var(API_URL_ENV).ok(), self.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
    }

    /// Username to prefill the login form with
    pub fn initial_username(&self) -> Option<String> {
        Self::resolve(std::env::var(USERNAME_ENV).ok(), self.last_username.clone())
    }

    /// First non-blank value wins
    fn resolve(env_value: Option<String>, file_value: Option<String>) -> Option<String> {
        env_value
            .filter(|v| !v.trim().is_empty())
            .or(file_value.filter(|v| !v.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            api_base_url: Some("http://aula.test:8080".to_string()),
            last_username: Some("alice".to_string()),
        };
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_resolve_prefers_env_then_file() {
        assert_eq!(
            Config::resolve(Some("env".into()), Some("file".into())),
            Some("env".to_string())
        );
        assert_eq!(
            Config::resolve(Some("  ".into()), Some("file".into())),
            Some("file".to_string())
        );
        assert_eq!(Config::resolve(None, Some(String::new())), None);
    }
}
