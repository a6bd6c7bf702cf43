//! Bindery Configuration System
//!
//! Provides configuration for the SDL3 binding layer:
//! - Project configuration (bindery.toml)
//! - Global user configuration (~/.bindery/config.toml)
//! - Environment overrides (BINDERY_*)
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Global config (~/.bindery/config.toml)
//! 2. Project config (./bindery.toml)
//! 3. Environment variables (BINDERY_*)
//!
//! # Example
//!
//! ```no_run
//! use bindery_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("loading SDL from {}", config.sdl_library().display());
//! ```

pub mod global;
pub mod loader;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use global::GlobalConfig;
pub use loader::{Config, ConfigLoader, DEFAULT_LOG_LEVEL, DEFAULT_SDL_LIBRARY, DEFAULT_TTF_LIBRARY, PROJECT_FILE};
pub use project::{BackendConfig, BackendKind, LibraryConfig, LoggingConfig, ProjectConfig};
