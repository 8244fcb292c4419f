//! Tests for configuration and root folder resolution
//!
//! Covers the 4-tier priority order (CLI > environment > TOML > compiled
//! default) and the initializer's directory/database handling.
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate FABTRACK_ROOT_FOLDER or FABTRACK_ROOT are marked
//! with #[serial] to ensure they run sequentially, not in parallel.

use fabtrack_common::config::{
    CompiledDefaults, RootFolderInitializer, RootFolderResolver, DATABASE_FILE_NAME,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert_eq!(defaults.log_level, "info");
    assert!(defaults.log_file.is_none());

    let path_str = defaults.root_folder.to_string_lossy();
    assert!(
        path_str.contains("fabtrack"),
        "Default root should live in a fabtrack directory, got {}",
        path_str
    );
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var("FABTRACK_ROOT_FOLDER");
    env::remove_var("FABTRACK_ROOT");

    let resolver = RootFolderResolver::new("test-module");
    let root_folder = resolver.resolve();

    assert!(!root_folder.as_os_str().is_empty());

    let defaults = CompiledDefaults::for_current_platform();
    assert_eq!(root_folder, defaults.root_folder);
}

#[test]
#[serial]
fn test_resolver_env_var_root_folder() {
    let test_path = "/tmp/fabtrack-test-env-folder";
    env::set_var("FABTRACK_ROOT_FOLDER", test_path);

    let resolver = RootFolderResolver::new("test-module");
    let root_folder = resolver.resolve();

    assert_eq!(root_folder, PathBuf::from(test_path));

    env::remove_var("FABTRACK_ROOT_FOLDER");
}

#[test]
#[serial]
fn test_resolver_env_var_root() {
    let test_path = "/tmp/fabtrack-test-env-root";
    env::set_var("FABTRACK_ROOT", test_path);

    let resolver = RootFolderResolver::new("test-module");
    let root_folder = resolver.resolve();

    assert_eq!(root_folder, PathBuf::from(test_path));

    env::remove_var("FABTRACK_ROOT");
}

#[test]
#[serial]
fn test_resolver_root_folder_takes_precedence() {
    env::remove_var("FABTRACK_ROOT_FOLDER");
    env::remove_var("FABTRACK_ROOT");

    env::set_var("FABTRACK_ROOT_FOLDER", "/tmp/fabtrack-priority-1");
    env::set_var("FABTRACK_ROOT", "/tmp/fabtrack-priority-2");

    let resolver = RootFolderResolver::new("test-module");
    let root_folder = resolver.resolve();

    assert_eq!(root_folder, PathBuf::from("/tmp/fabtrack-priority-1"));

    env::remove_var("FABTRACK_ROOT_FOLDER");
    env::remove_var("FABTRACK_ROOT");
}

#[test]
#[serial]
fn test_resolver_cli_arg_takes_precedence_over_env() {
    env::set_var("FABTRACK_ROOT_FOLDER", "/tmp/fabtrack-from-env");

    let resolver = RootFolderResolver::new("test-module");
    let root_folder = resolver.resolve_with_cli(Some(Path::new("/tmp/fabtrack-from-cli")));

    assert_eq!(root_folder, PathBuf::from("/tmp/fabtrack-from-cli"));

    env::remove_var("FABTRACK_ROOT_FOLDER");
}

#[test]
fn test_initializer_database_path() {
    let root = PathBuf::from("/tmp/fabtrack-test-root");
    let initializer = RootFolderInitializer::new(root.clone());

    let db_path = initializer.database_path();
    assert_eq!(db_path, root.join(DATABASE_FILE_NAME));
}

#[test]
fn test_initializer_database_exists() {
    let root = PathBuf::from("/tmp/fabtrack-test-nonexistent");
    let initializer = RootFolderInitializer::new(root);

    assert!(!initializer.database_exists());
}

#[test]
fn test_initializer_creates_directory() {
    let test_dir = format!("/tmp/fabtrack-test-create-{}", std::process::id());
    let root = PathBuf::from(&test_dir);

    let _ = std::fs::remove_dir_all(&root);

    let initializer = RootFolderInitializer::new(root.clone());
    let result = initializer.ensure_directory_exists();

    assert!(result.is_ok(), "Failed to create directory: {:?}", result.err());
    assert!(root.exists(), "Directory was not created");
    assert!(root.is_dir(), "Created path is not a directory");

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn test_initializer_idempotent_directory_creation() {
    let test_dir = format!("/tmp/fabtrack-test-idempotent-{}", std::process::id());
    let root = PathBuf::from(&test_dir);

    let _ = std::fs::remove_dir_all(&root);

    let initializer = RootFolderInitializer::new(root.clone());

    let result1 = initializer.ensure_directory_exists();
    assert!(result1.is_ok());

    let result2 = initializer.ensure_directory_exists();
    assert!(result2.is_ok());

    assert!(root.exists());

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
#[serial]
fn test_resolver_missing_config_file_does_not_error() {
    env::remove_var("FABTRACK_ROOT_FOLDER");
    env::remove_var("FABTRACK_ROOT");

    // Use a module name that definitely won't have a config file
    let resolver = RootFolderResolver::new("nonexistent-test-module-12345");

    let root_folder = resolver.resolve();

    assert!(!root_folder.as_os_str().is_empty());

    let defaults = CompiledDefaults::for_current_platform();
    assert_eq!(root_folder, defaults.root_folder);
}
