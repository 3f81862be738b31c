//! Configuration file management.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use transit_core::{ClientConfig, DEFAULT_BASE_URL, FilePreferences, RetryConfig, SyncConfig};
use transit_types::Area;

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Service base URL
    #[serde(default)]
    pub base_url: Option<String>,

    /// HTTP basic auth user
    #[serde(default)]
    pub username: Option<String>,

    /// HTTP basic auth password
    #[serde(default)]
    pub password: Option<String>,

    /// Request timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Retry behaviour of network calls
    #[serde(default)]
    pub retry: RetrySettings,

    /// SQLite database holding lines and stops
    #[serde(default)]
    pub database: Option<PathBuf>,

    /// Preferences file (last reload time, last area filter)
    #[serde(default)]
    pub preferences: Option<PathBuf>,

    /// Area codes whose lines are downloaded; every area when empty
    #[serde(default)]
    pub areas: Vec<i64>,

    /// Disable colored output
    #[serde(default)]
    pub no_color: bool,
}

/// Retry settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Attempts per call, including the first
    #[serde(default)]
    pub attempts: Option<u32>,

    /// Backoff step in milliseconds; the n-th wait is n steps long
    #[serde(default)]
    pub step_ms: Option<u64>,
}

impl Config {
    /// Get the default config file path
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("transit")
            .join("config.toml")
    }

    /// Load config from `explicit`, or from the default path.
    ///
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load config from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Save config to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// HTTP client settings; `base_url` overrides the file.
    pub fn client_config(&self, base_url: Option<&str>) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            base_url: base_url
                .map(str::to_string)
                .or_else(|| self.base_url.clone())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            username: self.username.clone(),
            password: self.password.clone(),
            timeout: self.timeout.map_or(defaults.timeout, Duration::from_secs),
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        let mut config = RetryConfig::default();
        if let Some(attempts) = self.retry.attempts {
            config = config.max_attempts(attempts);
        }
        if let Some(step) = self.retry.step_ms {
            config = config.step(Duration::from_millis(step));
        }
        config
    }

    /// Synchronizer settings, rejecting unknown area codes.
    pub fn sync_config(&self) -> Result<SyncConfig> {
        let mut config = SyncConfig::default();
        if !self.areas.is_empty() {
            config.areas = self
                .areas
                .iter()
                .map(|code| Area::try_from(*code))
                .collect::<Result<_, _>>()
                .context("Invalid area in config")?;
        }
        Ok(config)
    }

    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(transit_store::default_db_path)
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.preferences
            .clone()
            .unwrap_or_else(FilePreferences::default_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        let client = config.client_config(None);
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
        assert_eq!(client.timeout, Duration::from_secs(30));
        assert!(client.username.is_none());
        assert_eq!(config.retry_config(), RetryConfig::default());
        assert_eq!(config.sync_config().unwrap().areas, Area::ALL.to_vec());
    }

    #[test]
    fn test_parse_full_file() {
        let config: Config = toml::from_str(
            r#"
            base_url = "http://localhost:9000/api"
            username = "reader"
            password = "secret"
            timeout = 5
            areas = [23, 24]
            database = "/tmp/transit.db"

            [retry]
            attempts = 3
            step_ms = 50
            "#,
        )
        .unwrap();

        let client = config.client_config(None);
        assert_eq!(client.base_url, "http://localhost:9000/api");
        assert_eq!(client.username.as_deref(), Some("reader"));
        assert_eq!(client.timeout, Duration::from_secs(5));

        let retry = config.retry_config();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.delay_for_attempt(2), Duration::from_millis(100));

        assert_eq!(
            config.sync_config().unwrap().areas,
            vec![Area::UrbanTrento, Area::UrbanRovereto]
        );
        assert_eq!(config.database_path(), PathBuf::from("/tmp/transit.db"));
    }

    #[test]
    fn test_base_url_argument_overrides_file() {
        let config = Config {
            base_url: Some("http://file".into()),
            ..Default::default()
        };
        assert_eq!(config.client_config(Some("http://arg")).base_url, "http://arg");
    }

    #[test]
    fn test_unknown_area_is_rejected() {
        let config = Config {
            areas: vec![23, 99],
            ..Default::default()
        };
        assert!(config.sync_config().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            timeout: Some(12),
            areas: vec![7],
            ..Default::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load(Some(&path)).unwrap(), config);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
