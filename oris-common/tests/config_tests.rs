//! Configuration resolution tests
//!
//! Tests the resolution priority: CLI → environment → TOML file → defaults,
//! and that a missing default config file degrades to defaults.
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate ORIS_CONFIG or ORIS_API_URL are marked with #[serial].

use oris_common::config::{ConfigOrigin, TomlConfig, API_URL_ENV_VAR, CONFIG_ENV_VAR};
use oris_common::Error;
use serial_test::serial;
use std::env;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn clear_env() {
    env::remove_var(CONFIG_ENV_VAR);
    env::remove_var(API_URL_ENV_VAR);
}

#[test]
#[serial]
fn test_cli_path_is_loaded() {
    clear_env();
    let file = write_config(
        r#"
        [oris]
        base_url = "http://localhost:9000/API/"
        concurrency = 2

        [logging]
        level = "debug"
        "#,
    );

    let config = TomlConfig::resolve(Some(file.path()), None).unwrap();
    assert_eq!(config.oris.base_url, "http://localhost:9000/API/");
    assert_eq!(config.oris.concurrency, 2);
    assert_eq!(config.logging.level, "debug");
}

#[test]
#[serial]
fn test_env_path_used_without_cli_path() {
    clear_env();
    let file = write_config("[oris]\nmax_retries = 7\n");
    env::set_var(CONFIG_ENV_VAR, file.path());

    let config = TomlConfig::resolve(None, None).unwrap();
    assert_eq!(config.oris.max_retries, 7);

    clear_env();
}

#[test]
#[serial]
fn test_explicit_missing_file_is_error() {
    clear_env();
    let result = TomlConfig::resolve(Some(std::path::Path::new("/nonexistent/oris.toml")), None);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_api_url_priority() {
    clear_env();
    let file = write_config("[oris]\nbase_url = \"http://from-toml/\"\n");

    env::set_var(API_URL_ENV_VAR, "http://from-env/");
    let config = TomlConfig::resolve(Some(file.path()), None).unwrap();
    assert_eq!(config.oris.base_url, "http://from-env/");

    let config = TomlConfig::resolve(Some(file.path()), Some("http://from-cli/")).unwrap();
    assert_eq!(config.oris.base_url, "http://from-cli/");

    clear_env();
}

#[test]
#[serial]
fn test_invalid_toml_is_config_error() {
    clear_env();
    let file = write_config("[oris\nbase_url = ");
    let result = TomlConfig::resolve(Some(file.path()), None);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_origin_reports_loaded_file() {
    clear_env();
    let file = write_config("[oris]\nconcurrency = 3\n");

    let (config, origin) = TomlConfig::resolve_with_origin(Some(file.path()), None).unwrap();

    assert_eq!(config.oris.concurrency, 3);
    assert_eq!(origin, ConfigOrigin::File(file.path().to_path_buf()));
}

#[test]
#[serial]
fn test_origin_reports_defaults_without_file() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let saved = env::var_os("XDG_CONFIG_HOME");
    env::set_var("XDG_CONFIG_HOME", dir.path());

    let (config, origin) = TomlConfig::resolve_with_origin(None, None).unwrap();

    match saved {
        Some(value) => env::set_var("XDG_CONFIG_HOME", value),
        None => env::remove_var("XDG_CONFIG_HOME"),
    }
    assert_eq!(origin, ConfigOrigin::Defaults);
    assert_eq!(config, TomlConfig::default());
}
