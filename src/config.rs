// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `AQUANET_*` environment variables.

use crate::types::PressureBand;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix for environment overrides (`AQUANET_LOG_LEVEL`, ...)
pub const ENV_PREFIX: &str = "AQUANET";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Snapshot file the CLI loads and saves
    pub data_file: PathBuf,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Lowest tank fill fraction with adequate pressure
    pub pressure_low: f64,
    /// Highest tank fill fraction with adequate pressure
    pub pressure_high: f64,
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("org", "hyperpolymath", "aquanet")
}

impl Default for Config {
    fn default() -> Self {
        let band = PressureBand::default();
        Self {
            data_file: project_dirs()
                .map(|d| d.data_dir().join("network.json"))
                .unwrap_or_else(|| PathBuf::from("network.json")),
            log_level: "info".to_string(),
            pressure_low: band.low,
            pressure_high: band.high,
        }
    }
}

impl Config {
    /// Pressure band used for connection suggestions
    #[must_use]
    pub fn pressure_band(&self) -> PressureBand {
        PressureBand { low: self.pressure_low, high: self.pressure_high }
    }

    /// Look up a single setting by key, rendered as text
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "data_file" => Some(self.data_file.display().to_string()),
            "log_level" => Some(self.log_level.clone()),
            "pressure_low" => Some(self.pressure_low.to_string()),
            "pressure_high" => Some(self.pressure_high.to_string()),
            _ => None,
        }
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// Default location of the configuration file
#[must_use]
pub fn default_path() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().join("config.toml"))
}

/// Load configuration, reading `path` (or the default location) when present
pub fn load(path: Option<&Path>) -> Result<Config> {
    let defaults = Config::default();
    let mut builder = config::Config::builder()
        .set_default("data_file", defaults.data_file.to_string_lossy().into_owned())?
        .set_default("log_level", defaults.log_level)?
        .set_default("pressure_low", defaults.pressure_low)?
        .set_default("pressure_high", defaults.pressure_high)?;

    match path {
        Some(path) => {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        None => {
            if let Some(path) = default_path() {
                builder = builder.add_source(config::File::from(path).required(false));
            }
        }
    }

    let settings = builder
        .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .build()
        .context("Failed to load configuration")?;

    let config: Config = settings
        .try_deserialize()
        .context("Invalid configuration")?;

    if !(0.0..=1.0).contains(&config.pressure_low)
        || !(0.0..=1.0).contains(&config.pressure_high)
        || config.pressure_low > config.pressure_high
    {
        anyhow::bail!(
            "Invalid pressure band {}..{}: expected 0 <= low <= high <= 1",
            config.pressure_low,
            config.pressure_high
        );
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.pressure_band(), PressureBand::default());
        assert!(config.data_file.ends_with("network.json"));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("aquanet.toml");
        fs::write(&path, "log_level = \"debug\"\npressure_low = 0.2\n").unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.pressure_low, 0.2);
        assert_eq!(config.pressure_high, 0.9);
    }

    #[test]
    fn test_invalid_band_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("aquanet.toml");
        fs::write(&path, "pressure_low = 0.8\npressure_high = 0.3\n").unwrap();

        assert!(load(Some(&path)).is_err());
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_get_and_render() {
        let config = Config::default();
        assert_eq!(config.get("pressure_high").as_deref(), Some("0.9"));
        assert!(config.get("unknown").is_none());
        assert!(config.to_toml().unwrap().contains("log_level = \"info\""));
    }
}
