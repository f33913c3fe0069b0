//! Daemon configuration file handling

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use xing_core::SystemConfig;

/// Top-level daemon configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Crossing system tunables
    #[serde(default)]
    pub system: SystemConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Apply command-line values over the file
    pub fn merge_with_args(&mut self, port: Option<u16>, seed: Option<u64>) {
        if let Some(port) = port {
            self.server.port = port;
        }
        if let Some(seed) = seed {
            self.system.seed = Some(seed);
        }
    }
}
