//! Configuration system for Nodetop

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Global application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub refresh: RefreshConfig,
    pub display: DisplayConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("nodetop").join("config.toml"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080/api".to_string(),
            token: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub inventory_interval_secs: u64,
    pub metrics_interval_secs: u64,
    pub render_tick_ms: u64,
    pub poller_tick_ms: u64,
}

impl RefreshConfig {
    pub fn inventory_interval(&self) -> Duration {
        Duration::from_secs(self.inventory_interval_secs)
    }

    pub fn metrics_interval(&self) -> Duration {
        Duration::from_secs(self.metrics_interval_secs)
    }

    pub fn render_tick(&self) -> Duration {
        Duration::from_millis(self.render_tick_ms.max(1))
    }

    pub fn poller_tick(&self) -> Duration {
        Duration::from_millis(self.poller_tick_ms.max(1))
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            inventory_interval_secs: 30,
            metrics_interval_secs: 5,
            render_tick_ms: 100,
            poller_tick_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub theme: String,
    pub min_width: u16,
    pub min_height: u16,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            theme: "classic".to_string(),
            min_width: 80,
            min_height: 24,
        }
    }
}

/// Write a default configuration file
pub fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Configuration already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    Config::default().save(path)?;
    println!("Created {}", path.display());
    Ok(())
}
