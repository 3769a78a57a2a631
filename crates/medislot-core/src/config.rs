//! TOML-based tool configuration.
//!
//! Stores defaults the operator does not want to repeat on every
//! invocation: the provider deployment URL, a username, a home region
//! override and the retry interval. Passwords are never stored here.
//!
//! Configuration lives at `~/.config/medislot/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

fn default_base_url() -> String {
    "https://portal.medislot.example".to_string()
}

fn default_interval() -> i64 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Provider deployment to talk to.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Login fallback when no --username flag or env var is given.
    #[serde(default)]
    pub username: Option<String>,
    /// Default region name; the account's home region when unset.
    #[serde(default)]
    pub region: Option<String>,
    /// Default retry interval in seconds (negative = jitter ceiling).
    #[serde(default = "default_interval")]
    pub retry_interval_secs: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            username: None,
            region: None,
            retry_interval_secs: default_interval(),
        }
    }
}

impl Config {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("medislot")
            .join("config.toml")
    }

    /// Load the config file, falling back to defaults when it does not
    /// exist. A file that exists but does not parse is an error, not a
    /// silent default.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        Self::load(&Self::config_path())
    }

    pub fn load(path: &PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::SaveFailed {
                path: path.clone(),
                message: e.to_string(),
            })?;
        }
        let text = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(path, text).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.retry_interval_secs, 5);
        assert!(config.username.is_none());
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config {
            base_url: "https://mol.test".into(),
            username: Some("user@example.com".into()),
            region: Some("Warszawa".into()),
            retry_interval_secs: -30,
        };
        config.save_to(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.base_url, "https://mol.test");
        assert_eq!(loaded.username.as_deref(), Some("user@example.com"));
        assert_eq!(loaded.retry_interval_secs, -30);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "base_url = [not toml").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
