//! Configuration loading tests
//!
//! Precedence between global, project and environment sources, plus
//! rejection of malformed files.

use bindery_config::project::{BackendKind, ProjectConfig};
use bindery_config::{ConfigError, ConfigLoader, PROJECT_FILE};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_project(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join(PROJECT_FILE);
    fs::write(&path, content).unwrap();
    path
}

fn loader_in(dir: &TempDir) -> ConfigLoader {
    ConfigLoader::with_global_path(dir.path().join("no-global.toml"))
}

#[test]
#[serial]
fn test_env_overrides_library_and_log() {
    let temp_dir = TempDir::new().unwrap();
    write_project(
        temp_dir.path(),
        "[library]\nsdl = \"SDL3\"\n\n[logging]\nlevel = \"warn\"\n",
    );

    env::set_var("BINDERY_SDL_LIBRARY", "/opt/sdl/libSDL3.so");
    env::set_var("BINDERY_LOG", "info,bindery_runtime=trace");
    let result = loader_in(&temp_dir).load_from_directory(temp_dir.path());
    env::remove_var("BINDERY_SDL_LIBRARY");
    env::remove_var("BINDERY_LOG");

    let config = result.unwrap();
    assert_eq!(config.sdl_library(), PathBuf::from("/opt/sdl/libSDL3.so"));
    assert_eq!(config.log_level(), "info,bindery_runtime=trace");
}

#[test]
#[serial]
fn test_blank_env_values_are_ignored() {
    let temp_dir = TempDir::new().unwrap();
    write_project(temp_dir.path(), "[backend]\nkind = \"headless\"\n");

    env::set_var("BINDERY_BACKEND", "   ");
    let result = loader_in(&temp_dir).load_from_directory(temp_dir.path());
    env::remove_var("BINDERY_BACKEND");

    assert_eq!(result.unwrap().backend(), BackendKind::Headless);
}

#[test]
#[serial]
fn test_invalid_env_log_level() {
    let temp_dir = TempDir::new().unwrap();

    env::set_var("BINDERY_LOG", "loud");
    let result = loader_in(&temp_dir).load_from_directory(temp_dir.path());
    env::remove_var("BINDERY_LOG");

    match result {
        Err(ConfigError::InvalidValue { field, reason }) => {
            assert_eq!(field, "BINDERY_LOG");
            assert!(reason.contains("unknown log level 'loud'"), "{}", reason);
        }
        other => panic!("expected InvalidValue, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_load_from_file_sets_root() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_project(temp_dir.path(), "[logging]\nansi = true\n");

    let config = loader_in(&temp_dir).load_from_file(&path).unwrap();
    assert!(config.log_ansi());
    assert_eq!(config.project_root(), Some(temp_dir.path()));
}

#[test]
#[serial]
fn test_missing_explicit_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(PROJECT_FILE);
    let result = loader_in(&temp_dir).load_from_file(&path);
    assert!(matches!(result, Err(ConfigError::NotFound(p)) if p == path));
}

#[rstest]
#[case::unknown_section("[window]\ntitle = \"x\"\n")]
#[case::unknown_key("[library]\nsdl2 = \"SDL2\"\n")]
#[case::bad_backend("[backend]\nkind = \"vulkan\"\n")]
#[case::not_toml("[library\n")]
fn test_malformed_files_fail_to_parse(#[case] content: &str) {
    let result = ProjectConfig::parse(content, Path::new("bindery.toml"));
    assert!(matches!(result, Err(ConfigError::TomlParseError { .. })), "{:?}", result);
}

#[rstest]
#[case::empty_library("[library]\nttf = \"\"\n", "library.ttf")]
#[case::empty_search_path("[library]\nsearch_paths = [\"\"]\n", "library.search_paths")]
#[case::empty_level("[logging]\nlevel = \" \"\n", "logging.level")]
fn test_invalid_values_name_their_field(#[case] content: &str, #[case] expected: &str) {
    match ProjectConfig::parse(content, Path::new("bindery.toml")) {
        Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, expected),
        other => panic!("expected InvalidValue, got {:?}", other),
    }
}

#[test]
fn test_serialized_config_parses_back() {
    let config = ProjectConfig::parse(
        "[library]\nsdl = \"SDL3\"\nsearch_paths = [\"/opt/lib\"]\n\n[backend]\nkind = \"headless\"\n",
        Path::new("bindery.toml"),
    )
    .unwrap();
    let text = toml::to_string(&config).unwrap();
    insta::assert_snapshot!(text, @r###"
    [library]
    sdl = "SDL3"
    search_paths = ["/opt/lib"]

    [backend]
    kind = "headless"
    "###);
}
