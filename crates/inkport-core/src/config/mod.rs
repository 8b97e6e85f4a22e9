//! Configuration management for Inkport.
//!
//! This module handles loading, saving, and validating Inkport configuration.
//!
//! ## Configuration File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/inkport/config.toml` |
//! | macOS | `~/Library/Application Support/Inkport/config.toml` |
//! | Windows | `%APPDATA%\Inkport\config.toml` |
//!
//! ## Example
//!
//! ```rust,ignore
//! use inkport_core::config::Config;
//!
//! let config = Config::load()?;
//! println!("Import timeout: {:?}", config.import.load_timeout);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration struct for Inkport.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Import settings
    pub import: ImportConfig,
    /// Export settings
    pub export: ExportConfig,
    /// Rendering settings
    pub render: RenderConfig,
}

/// Import configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Width used for strokes without a usable width
    pub default_width: f32,
    /// Longest bounding-box side accepted without confirmation
    pub max_bounding_size: f32,
    /// Budget for one fetch
    #[serde(with = "humantime_serde")]
    pub load_timeout: Duration,
    /// How often the load timeout is checked
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Initial import scale
    pub scale: f32,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            default_width: crate::DEFAULT_STROKE_WIDTH,
            max_bounding_size: crate::DEFAULT_MAX_BOUNDING_SIZE,
            load_timeout: Duration::from_secs(crate::DEFAULT_LOAD_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(1),
            scale: 1.0,
        }
    }
}

/// Export configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Width used when neither the stroke nor its tool has one
    pub default_pen_width: f32,
    /// Width configured on the drawing tool, if any
    pub tool_width: Option<f32>,
    /// Tag prefixed to transport lines
    pub log_tag: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_pen_width: crate::DEFAULT_STROKE_WIDTH,
            tool_width: None,
            log_tag: crate::DEFAULT_LOG_TAG.to_string(),
        }
    }
}

/// Rendering configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Whether the host provides a pickup container
    pub pickup_enabled: bool,
    /// Import into the pickup container by default
    pub pickup_mode: bool,
    /// Render layer for strokes
    pub line_layer: u32,
    /// Group world-fixed strokes by color
    pub group_by_color: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            pickup_enabled: true,
            pickup_mode: false,
            line_layer: 0,
            group_by_color: true,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// If the configuration file doesn't exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults if it is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("Failed to read config: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    ///
    /// Creates the configuration directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigError(format!("Failed to create config directory: {e}"))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| Error::ConfigError(format!("Failed to write config: {e}")))
    }

    /// Reject values the importer and exporter cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        positive("import.default_width", self.import.default_width)?;
        positive("import.max_bounding_size", self.import.max_bounding_size)?;
        positive("import.scale", self.import.scale)?;
        positive("export.default_pen_width", self.export.default_pen_width)?;
        if let Some(width) = self.export.tool_width {
            positive("export.tool_width", width)?;
        }
        if self.import.load_timeout.is_zero() {
            return Err(invalid("import.load_timeout", "must be longer than zero"));
        }
        if self.import.poll_interval.is_zero() {
            return Err(invalid("import.poll_interval", "must be longer than zero"));
        }
        if self.export.log_tag.trim().is_empty() {
            return Err(invalid("export.log_tag", "must not be empty"));
        }
        Ok(())
    }

    /// Get the default configuration directory path.
    #[must_use]
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "inkport", "Inkport")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the full path to the configuration file.
    #[must_use]
    pub fn config_path() -> PathBuf {
        Self::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }
}

fn positive(key: &str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(key, &format!("must be a positive number, got {value}")))
    }
}

fn invalid(key: &str, reason: &str) -> Error {
    Error::InvalidConfig {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let secs = duration.as_secs();
        if secs >= 60 && secs % 60 == 0 {
            serializer.serialize_str(&format!("{}m", secs / 60))
        } else {
            serializer.serialize_str(&format!("{secs}s"))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.strip_suffix('s')
            .map(|secs| {
                secs.parse()
                    .map(Duration::from_secs)
                    .map_err(serde::de::Error::custom)
            })
            .or_else(|| {
                s.strip_suffix('m').map(|mins| {
                    mins.parse::<u64>()
                        .map(|m| Duration::from_secs(m * 60))
                        .map_err(serde::de::Error::custom)
                })
            })
            .unwrap_or_else(|| Err(serde::de::Error::custom("invalid duration format")))
    }
}
