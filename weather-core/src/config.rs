use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

/// Top-level configuration stored on disk, shared by the server and the
/// CLI.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// listen_addr = "0.0.0.0:8080"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// OpenWeatherMap API key, sent as the `appid` query parameter on
    /// every upstream call.
    pub api_key: Option<String>,

    /// Upstream base URL override; defaults to the public
    /// OpenWeatherMap endpoint.
    pub base_url: Option<String>,

    /// Address the HTTP server binds to.
    pub listen_addr: Option<String>,

    /// Upstream request timeout in seconds. Absent means no timeout: the
    /// call waits as long as the provider does.
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn listen_addr(&self) -> &str {
        self.listen_addr.as_deref().unwrap_or("0.0.0.0:8080")
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "zipweather", "zipweather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
