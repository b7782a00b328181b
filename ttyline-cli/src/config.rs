//! Configuration file support for ttyline.
//!
//! Configuration is loaded from multiple sources with the following priority (highest first):
//! 1. Command-line arguments
//! 2. Environment variables (TTYLINE_*)
//! 3. Local config file (./ttyline.toml)
//! 4. Global config file (~/.config/ttyline/config.toml)
//!
//! Layers 1 and 2 are handled by clap; this module covers the files and the
//! final merge into [`PortSettings`].

use directories::ProjectDirs;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use ttyline::PortSettings;

/// Local configuration file name, looked up in the working directory.
const LOCAL_CONFIG_FILE: &str = "ttyline.toml";

/// Port configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PortConfig {
    /// Preferred device node (e.g., "/dev/ttyUSB0").
    pub path: Option<String>,
    /// Default baud rate.
    pub baud: Option<u32>,
    /// Default read timeout in seconds (negative waits forever).
    pub timeout: Option<f64>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Port configuration.
    #[serde(default)]
    pub port: PortConfig,
}

impl Config {
    /// Load configuration from all available sources.
    pub fn load() -> Self {
        let mut config = Self::default();

        // Load global config
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global_config) = Self::load_from_file(&global_path) {
                debug!("Loaded global config from {}", global_path.display());
                config.merge(global_config);
            }
        }

        // Load local config (overrides global)
        if let Some(local_config) = Self::load_from_file(Path::new(LOCAL_CONFIG_FILE)) {
            debug!("Loaded local config from {LOCAL_CONFIG_FILE}");
            config.merge(local_config);
        }

        config
    }

    /// Load configuration from a specific file path (--config flag).
    pub fn load_from_path(path: &Path) -> Self {
        if let Some(config) = Self::load_from_file(path) {
            debug!("Loaded config from {}", path.display());
            config
        } else {
            warn!(
                "Could not load config from {}, using defaults",
                path.display()
            );
            Self::default()
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!("Failed to parse config file {}: {}", path.display(), e);
                    None
                },
            },
            Err(e) => {
                warn!("Failed to read config file {}: {}", path.display(), e);
                None
            },
        }
    }

    /// Get the global configuration directory.
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "ttyline").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the global configuration file path.
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Merge another config into this one; values set in `other` win.
    fn merge(&mut self, other: Self) {
        if other.port.path.is_some() {
            self.port.path = other.port.path;
        }
        if other.port.baud.is_some() {
            self.port.baud = other.port.baud;
        }
        if other.port.timeout.is_some() {
            self.port.timeout = other.port.timeout;
        }
    }

    /// Resolve the port settings: explicit values first, then this config,
    /// then the library defaults.
    pub fn resolve(
        &self,
        path: Option<&str>,
        baud: Option<u32>,
        timeout: Option<f64>,
    ) -> PortSettings {
        let defaults = PortSettings::default();
        PortSettings {
            path: path
                .map(str::to_string)
                .or_else(|| self.port.path.clone())
                .unwrap_or(defaults.path),
            baud_rate: baud.or(self.port.baud).unwrap_or(defaults.baud_rate),
            timeout: timeout.or(self.port.timeout).unwrap_or(defaults.timeout),
        }
    }
}
