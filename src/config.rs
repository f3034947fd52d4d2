//! Configuration for simple-console.
//!
//! Settings are read from `~/.simple-console/config.toml`, or from the file
//! named by the `SIMPLE_CONSOLE_CONFIG` environment variable:
//!
//! ```toml
//! # Recovery when standard output is redirected
//! attach_parent = true
//! allocate = true
//!
//! # Log filter for the sconsole log file
//! log_level = "info"
//!
//! # Colors assumed when the console's own defaults cannot be read
//! [fallback]
//! foreground = "gray"
//! background = "black"
//! ```
//!
//! A missing or malformed file silently yields the defaults.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::attributes::{Attributes, Color};
use crate::handle::FallbackPolicy;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "SIMPLE_CONSOLE_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Attach to the parent's console when stdout is not one
    pub attach_parent: bool,
    /// Allocate a new console when attaching is not possible
    pub allocate: bool,
    pub log_level: String,
    pub fallback: FallbackColors,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            attach_parent: true,
            allocate: true,
            log_level: "info".to_string(),
            fallback: FallbackColors::default(),
        }
    }
}

/// Default colors used when they cannot be read from the console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackColors {
    pub foreground: Color,
    pub background: Color,
}

impl Default for FallbackColors {
    fn default() -> Self {
        Self {
            foreground: Color::Gray,
            background: Color::Black,
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from file, falling back to defaults
    pub fn load() -> Self {
        if let Some(path) = Self::config_path() {
            if path.exists() {
                match Self::from_file(&path) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!("Ignoring config: {}", e),
                }
            }
        }
        Self::default()
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get config file path
    pub fn config_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        data_dir().map(|dir| dir.join("config.toml"))
    }

    pub fn fallback_policy(&self) -> FallbackPolicy {
        FallbackPolicy {
            attach_parent: self.attach_parent,
            allocate: self.allocate,
        }
    }

    pub fn fallback_attributes(&self) -> Attributes {
        Attributes::new(self.fallback.foreground, self.fallback.background)
    }
}

/// `~/.simple-console`, home taken from `USERPROFILE` or `HOME`
pub fn data_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
        .map(|home| home.join(".simple-console"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_factory_console() {
        let config = ConsoleConfig::default();
        assert!(config.attach_parent);
        assert!(config.allocate);
        assert_eq!(config.fallback_attributes(), Attributes::FALLBACK);
        assert_eq!(config.fallback_policy(), FallbackPolicy::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = ConsoleConfig::from_toml_str("allocate = false\n").unwrap();
        assert!(config.attach_parent);
        assert!(!config.allocate);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.fallback, FallbackColors::default());
    }

    #[test]
    fn test_fallback_colors_by_name() {
        let toml = r#"
            log_level = "debug"

            [fallback]
            foreground = "white"
            background = "dark-blue"
        "#;
        let config = ConsoleConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(
            config.fallback_attributes(),
            Attributes::new(Color::White, Color::DarkBlue)
        );
    }

    #[test]
    fn test_invalid_color_is_rejected() {
        let result = ConsoleConfig::from_toml_str("[fallback]\nforeground = \"purple\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_serialized_config_reloads() {
        let mut config = ConsoleConfig::default();
        config.attach_parent = false;
        config.fallback.background = Color::DarkRed;

        let text = config.to_toml_string().unwrap();
        assert_eq!(ConsoleConfig::from_toml_str(&text).unwrap(), config);
    }
}
