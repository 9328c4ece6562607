//! Configuration Management
//!
//! Handles persistent configuration storage for awsinv.

use crate::engine::registry::DEFAULT_CONCURRENCY;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// User configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base directory for the snapshot tree
    pub directory: PathBuf,
    /// Concurrent requests per endpoint
    pub concurrency: usize,
    /// Attempts per request before giving up; unset retries forever
    pub max_attempts: Option<u32>,
    /// Region substrings to collect; empty collects every region
    pub regions: Vec<String>,
    /// Service substrings to collect; empty runs every collector
    pub services: Vec<String>,
    /// AWS profile name
    pub profile: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("var"),
            concurrency: DEFAULT_CONCURRENCY.get(),
            max_attempts: None,
            regions: Vec::new(),
            services: Vec::new(),
            profile: None,
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("awsinv").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from `path`, falling back to defaults when absent or unreadable
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }
}

/// Parse a concurrency bound: a whole number of at least 1
pub fn parse_concurrency(s: &str) -> std::result::Result<usize, String> {
    let n: usize = s
        .trim()
        .parse()
        .map_err(|_| format!("concurrency must be a whole number >= 1, got {:?}", s))?;
    if n < 1 {
        return Err(format!("concurrency must be at least 1, got {}", n));
    }
    Ok(n)
}

/// Split comma-separated filter values, dropping empty entries
pub fn split_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}
