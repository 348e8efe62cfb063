//! Configuration loading and root folder resolution
//!
//! Tests touching FIBERTRACK_ROOT_FOLDER are marked #[serial] so they never
//! race on the process environment.

use fibertrack_common::config::{
    CompiledDefaults, ConfigOrigin, KeyLookup, RootFolderInitializer, RootFolderResolver, TomlConfig,
    DATABASE_FILE_NAME, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert_eq!(defaults.log_level, "info");
    assert!(defaults.root_folder.to_string_lossy().contains("fibertrack"));
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let root_folder = RootFolderResolver::new().resolve();
    assert_eq!(root_folder, CompiledDefaults::for_current_platform().root_folder);
}

#[test]
#[serial]
fn test_resolver_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/fibertrack-env-root");

    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/fibertrack-toml-root")),
        ..Default::default()
    };
    let root_folder = RootFolderResolver::new().with_toml(&toml).resolve();

    env::remove_var(ROOT_FOLDER_ENV);
    assert_eq!(root_folder, PathBuf::from("/tmp/fibertrack-env-root"));
}

#[test]
#[serial]
fn test_resolver_cli_beats_env() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/fibertrack-env-root");

    let root_folder = RootFolderResolver::new()
        .with_cli_arg(Some(PathBuf::from("/tmp/fibertrack-cli-root")))
        .resolve();

    env::remove_var(ROOT_FOLDER_ENV);
    assert_eq!(root_folder, PathBuf::from("/tmp/fibertrack-cli-root"));
}

#[test]
#[serial]
fn test_resolver_blank_env_is_ignored() {
    env::set_var(ROOT_FOLDER_ENV, "   ");

    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/fibertrack-toml-root")),
        ..Default::default()
    };
    let root_folder = RootFolderResolver::new().with_toml(&toml).resolve();

    env::remove_var(ROOT_FOLDER_ENV);
    assert_eq!(root_folder, PathBuf::from("/tmp/fibertrack-toml-root"));
}

#[test]
fn test_missing_explicit_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    let (config, origin) = TomlConfig::load_or_default(Some(&missing));
    assert_eq!(config, TomlConfig::default());
    assert_eq!(origin, ConfigOrigin::NotFound(missing));
}

#[test]
fn test_malformed_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[server\nport = ").unwrap();

    assert!(TomlConfig::load(&path).is_err());
    let (config, origin) = TomlConfig::load_or_default(Some(&path));
    assert_eq!(config, TomlConfig::default());
    assert!(matches!(origin, ConfigOrigin::Invalid(_)));
}

#[test]
fn test_config_file_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[logging]\nlevel = \"debug\"\n\n[ingest]\nkey_lookup = \"set-difference\"\n",
    )
    .unwrap();

    let (config, origin) = TomlConfig::load_or_default(Some(&path));
    assert_eq!(origin, ConfigOrigin::File(path));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.ingest.key_lookup, KeyLookup::SetDifference);
}

#[test]
fn test_initializer_creates_nested_root() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("a").join("b");

    let init = RootFolderInitializer::new(root.clone());
    init.ensure_directory_exists().unwrap();
    init.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert_eq!(init.database_path(), root.join(DATABASE_FILE_NAME));
}
