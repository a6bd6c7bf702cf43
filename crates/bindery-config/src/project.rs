//! Project Configuration (bindery.toml)
//!
//! Handles project-level configuration stored in `bindery.toml` at the project root.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Log levels accepted as a bare `[logging] level` value
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Project configuration from bindery.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Native library locations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<LibraryConfig>,

    /// Logging configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    /// Native backend selection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendConfig>,
}

/// Where to find the SDL3 and SDL3_ttf shared libraries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LibraryConfig {
    /// SDL3 library name or path (default: "SDL3")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdl: Option<PathBuf>,

    /// SDL3_ttf library name or path (default: "SDL3_ttf")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttf: Option<PathBuf>,

    /// Extra directories searched before the platform defaults
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_paths: Vec<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Level or filter directive (e.g. "info" or "info,bindery_runtime=debug")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Colorize output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ansi: Option<bool>,
}

/// Native backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Which call surface implementation to use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<BackendKind>,
}

/// Call surface implementation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Resolve symbols from the SDL3 shared libraries
    #[default]
    Dynamic,
    /// In-process backend with no display
    Headless,
}

impl BackendKind {
    /// Parse a backend name as used in `BINDERY_BACKEND`
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "dynamic" => Some(BackendKind::Dynamic),
            "headless" => Some(BackendKind::Headless),
            _ => None,
        }
    }
}

impl ProjectConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        Self::parse(&content, path)
    }

    /// Parse project configuration from TOML text
    ///
    /// `origin` is only used for error messages.
    pub fn parse(content: &str, origin: &Path) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::TomlParseError {
            file: origin.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(library) = &self.library {
            library.validate("library")?;
        }
        if let Some(logging) = &self.logging {
            logging.validate("logging")?;
        }
        Ok(())
    }
}

impl LibraryConfig {
    pub(crate) fn validate(&self, section: &str) -> ConfigResult<()> {
        for (key, value) in [("sdl", &self.sdl), ("ttf", &self.ttf)] {
            if matches!(value, Some(path) if path.as_os_str().is_empty()) {
                return Err(ConfigError::InvalidValue {
                    field: format!("{}.{}", section, key),
                    reason: "library name must not be empty".to_string(),
                });
            }
        }

        if self.search_paths.iter().any(|p| p.as_os_str().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: format!("{}.search_paths", section),
                reason: "search paths must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

impl LoggingConfig {
    pub(crate) fn validate(&self, section: &str) -> ConfigResult<()> {
        if let Some(level) = &self.level {
            validate_log_level(&format!("{}.level", section), level)?;
        }
        Ok(())
    }
}

/// Validate a log level or filter directive
///
/// Directives containing `=` or `,` are passed through to the subscriber's
/// filter parser; bare words must be a known level.
pub fn validate_log_level(field: &str, level: &str) -> ConfigResult<()> {
    let level = level.trim();
    if level.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: "log level must not be empty".to_string(),
        });
    }

    if level.contains('=') || level.contains(',') {
        return Ok(());
    }

    if LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!(
                "unknown log level '{}' (expected one of: {})",
                level,
                LOG_LEVELS.join(", ")
            ),
        })
    }
}
