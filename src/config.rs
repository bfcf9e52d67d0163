use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::fs;
use crate::error::{SwitchError, Result};
use log::info;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Profile store configuration
    #[serde(default)]
    pub store: StoreConfig,
    /// Host output configuration
    #[serde(default)]
    pub host: HostConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Profile store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON file holding profiles and the active selection
    pub path: PathBuf,
}

/// Where compiled payloads are published
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Directory receiving `proxy.pac` / `rules.json`
    pub output_dir: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("profiles.json") }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self { output_dir: PathBuf::from("proxy") }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| SwitchError::Config(format!("Invalid configuration: {}", e)))?;

        info!("Configuration loaded from file");
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SwitchError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content)?;

        info!("Configuration saved to file");
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.store.path.as_os_str().is_empty() {
            return Err(SwitchError::Config("store.path must not be empty".to_string()));
        }

        if self.host.output_dir.as_os_str().is_empty() {
            return Err(SwitchError::Config("host.output_dir must not be empty".to_string()));
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" | "off" => {},
            _ => return Err(SwitchError::Config("Invalid log level".to_string())),
        }

        Ok(())
    }
}
