//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::global::GlobalConfig;
use crate::project::{validate_log_level, BackendConfig, BackendKind, LibraryConfig, LoggingConfig, ProjectConfig};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};

/// Project configuration file name
pub const PROJECT_FILE: &str = "bindery.toml";

/// Default SDL3 library name
pub const DEFAULT_SDL_LIBRARY: &str = "SDL3";

/// Default SDL3_ttf library name
pub const DEFAULT_TTF_LIBRARY: &str = "SDL3_ttf";

/// Default log filter
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.bindery/config.toml) - lowest priority
/// 2. Project config (./bindery.toml) - overrides global
/// 3. Environment variables (BINDERY_*) - overrides project
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Project configuration (with environment overrides applied)
    pub project: ProjectConfig,

    /// Global configuration
    pub global: GlobalConfig,

    /// Project root directory (where bindery.toml was found)
    pub project_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Create a loader that reads the global config from `path` instead of
    /// `~/.bindery/config.toml`
    pub fn with_global_path(path: impl Into<PathBuf>) -> Self {
        Self {
            global_config_path: Some(path.into()),
        }
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find bindery.toml, then loads and merges
    /// global config if it exists.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;

        // Global config is best-effort: a missing home directory is not an error
        let global_config = match self.load_global_config() {
            Ok(config) => config,
            Err(ConfigError::HomeNotFound) => GlobalConfig::default(),
            Err(e) => return Err(e),
        };

        let project_config = self.apply_env_overrides(project_config)?;

        Ok(Config {
            project: project_config,
            global: global_config,
            project_root,
        })
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let project_config = ProjectConfig::load_from_file(config_path)?;
        let global_config = match self.load_global_config() {
            Ok(config) => config,
            Err(ConfigError::HomeNotFound) => GlobalConfig::default(),
            Err(e) => return Err(e),
        };

        let project_config = self.apply_env_overrides(project_config)?;
        let project_root = config_path.parent().map(|p| p.to_path_buf());

        Ok(Config {
            project: project_config,
            global: global_config,
            project_root,
        })
    }

    /// Find project configuration by walking up directory tree
    ///
    /// Returns (project_root, project_config); a default config with no root
    /// when no bindery.toml exists up to the filesystem root.
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(PROJECT_FILE);

            if config_path.exists() {
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, ProjectConfig::default())),
            }
        }
    }

    /// Load global configuration from ~/.bindery/config.toml
    fn load_global_config(&mut self) -> ConfigResult<GlobalConfig> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => {
                let path = GlobalConfig::global_config_path()?;
                self.global_config_path = Some(path.clone());
                path
            }
        };

        // Global config is optional - if it doesn't exist, return default
        if !path.exists() {
            return Ok(GlobalConfig::default());
        }

        GlobalConfig::load_from_file(&path)
    }

    /// Apply environment variable overrides to project config
    ///
    /// Recognized variables:
    /// - BINDERY_SDL_LIBRARY: SDL3 library name or path
    /// - BINDERY_TTF_LIBRARY: SDL3_ttf library name or path
    /// - BINDERY_LOG: log level or filter directive
    /// - BINDERY_BACKEND: "dynamic" or "headless"
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        if let Some(sdl) = non_empty_var("BINDERY_SDL_LIBRARY") {
            config
                .library
                .get_or_insert_with(LibraryConfig::default)
                .sdl = Some(PathBuf::from(sdl));
        }

        if let Some(ttf) = non_empty_var("BINDERY_TTF_LIBRARY") {
            config
                .library
                .get_or_insert_with(LibraryConfig::default)
                .ttf = Some(PathBuf::from(ttf));
        }

        if let Some(level) = non_empty_var("BINDERY_LOG") {
            validate_log_level("BINDERY_LOG", &level)?;
            config
                .logging
                .get_or_insert_with(LoggingConfig::default)
                .level = Some(level);
        }

        if let Some(backend) = non_empty_var("BINDERY_BACKEND") {
            let kind = BackendKind::parse(&backend).ok_or_else(|| ConfigError::InvalidValue {
                field: "BINDERY_BACKEND".to_string(),
                reason: format!("unknown backend '{}' (expected dynamic or headless)", backend),
            })?;
            config
                .backend
                .get_or_insert_with(BackendConfig::default)
                .kind = Some(kind);
        }

        Ok(config)
    }

    /// Get the global configuration directory (~/.bindery)
    pub fn global_config_dir() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".bindery"))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Effective SDL3 library name or path (project > global > default)
    pub fn sdl_library(&self) -> PathBuf {
        self.project
            .library
            .as_ref()
            .and_then(|l| l.sdl.clone())
            .or_else(|| self.global.library.as_ref().and_then(|l| l.sdl.clone()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SDL_LIBRARY))
    }

    /// Effective SDL3_ttf library name or path (project > global > default)
    pub fn ttf_library(&self) -> PathBuf {
        self.project
            .library
            .as_ref()
            .and_then(|l| l.ttf.clone())
            .or_else(|| self.global.library.as_ref().and_then(|l| l.ttf.clone()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TTF_LIBRARY))
    }

    /// Extra library search paths, project entries first
    pub fn search_paths(&self) -> Vec<PathBuf> {
        let project = self.project.library.iter().flat_map(|l| l.search_paths.iter());
        let global = self.global.library.iter().flat_map(|l| l.search_paths.iter());
        project.chain(global).cloned().collect()
    }

    /// Effective log filter (project > global > default)
    pub fn log_level(&self) -> &str {
        self.project
            .logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .or_else(|| self.global.logging.as_ref().and_then(|l| l.level.as_deref()))
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Whether log output is colorized
    pub fn log_ansi(&self) -> bool {
        self.project
            .logging
            .as_ref()
            .and_then(|l| l.ansi)
            .or_else(|| self.global.logging.as_ref().and_then(|l| l.ansi))
            .unwrap_or(false)
    }

    /// Selected backend
    pub fn backend(&self) -> BackendKind {
        self.project
            .backend
            .as_ref()
            .and_then(|b| b.kind)
            .unwrap_or_default()
    }

    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if this is a project (has bindery.toml)
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn create_config_file(dir: &Path, content: &str) -> PathBuf {
        let config_path = dir.join(PROJECT_FILE);
        fs::write(&config_path, content).unwrap();
        config_path
    }

    fn isolated_loader(dir: &TempDir) -> ConfigLoader {
        ConfigLoader::with_global_path(dir.path().join("global").join("config.toml"))
    }

    #[test]
    #[serial]
    fn test_load_project_config() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "[library]\nsdl = \"SDL3-custom\"\n");

        let mut loader = isolated_loader(&temp_dir);
        let config = loader.load_from_directory(temp_dir.path()).unwrap();

        assert_eq!(config.sdl_library(), PathBuf::from("SDL3-custom"));
        assert!(config.is_project());
    }

    #[test]
    #[serial]
    fn test_find_config_in_parent() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "[logging]\nlevel = \"debug\"\n");

        let sub_dir = temp_dir.path().join("subdir");
        fs::create_dir(&sub_dir).unwrap();

        let mut loader = isolated_loader(&temp_dir);
        let config = loader.load_from_directory(&sub_dir).unwrap();

        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.project_root(), Some(temp_dir.path()));
    }

    #[test]
    fn test_defaults_without_any_config() {
        let config = Config::default();
        assert_eq!(config.sdl_library(), PathBuf::from(DEFAULT_SDL_LIBRARY));
        assert_eq!(config.ttf_library(), PathBuf::from(DEFAULT_TTF_LIBRARY));
        assert_eq!(config.log_level(), DEFAULT_LOG_LEVEL);
        assert_eq!(config.backend(), BackendKind::Dynamic);
        assert!(!config.log_ansi());
        assert!(config.search_paths().is_empty());
    }

    #[test]
    #[serial]
    fn test_env_override_backend() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "[backend]\nkind = \"dynamic\"\n");

        env::set_var("BINDERY_BACKEND", "headless");

        let mut loader = isolated_loader(&temp_dir);
        let config = loader.load_from_directory(temp_dir.path());

        env::remove_var("BINDERY_BACKEND");
        assert_eq!(config.unwrap().backend(), BackendKind::Headless);
    }

    #[test]
    #[serial]
    fn test_env_override_invalid_backend() {
        let temp_dir = TempDir::new().unwrap();

        env::set_var("BINDERY_BACKEND", "vulkan");

        let mut loader = isolated_loader(&temp_dir);
        let result = loader.load_from_directory(temp_dir.path());

        env::remove_var("BINDERY_BACKEND");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    #[serial]
    fn test_global_fills_gaps() {
        let temp_dir = TempDir::new().unwrap();
        let global_path = temp_dir.path().join("global").join("config.toml");
        fs::create_dir_all(global_path.parent().unwrap()).unwrap();
        fs::write(
            &global_path,
            "[library]\nttf = \"/opt/ttf/libSDL3_ttf.so\"\nsearch_paths = [\"/opt/global\"]\n",
        )
        .unwrap();
        create_config_file(
            temp_dir.path(),
            "[library]\nsdl = \"SDL3\"\nsearch_paths = [\"/opt/project\"]\n",
        );

        let mut loader = ConfigLoader::with_global_path(&global_path);
        let config = loader.load_from_directory(temp_dir.path()).unwrap();

        assert_eq!(config.ttf_library(), PathBuf::from("/opt/ttf/libSDL3_ttf.so"));
        assert_eq!(
            config.search_paths(),
            vec![PathBuf::from("/opt/project"), PathBuf::from("/opt/global")]
        );
    }
}
