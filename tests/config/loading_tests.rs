// Config loading tests - AppConfig::load against real files and environment
//
// Every test touches the process environment, so they run serially.

use coordinator_core::config::{AppConfig, ConfigError};
use serial_test::serial;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::tempdir;

fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("coordinator.toml");
    fs::write(&path, content).expect("Failed to write config");
    path
}

fn set_credentials() {
    unsafe {
        env::set_var("GOOGLE_API_KEY", "test-key");
        env::set_var("OUTPUT_IMAGE_PATH", "/tmp/coordinator-images");
    }
}

#[test]
#[serial]
fn returns_error_when_file_not_found() {
    set_credentials();
    let result = AppConfig::load(Some(Path::new("/nonexistent/path/coordinator.toml")));
    assert!(matches!(result, Err(ConfigError::NotFound { .. })));
}

#[test]
#[serial]
fn returns_error_when_api_key_missing() {
    set_credentials();
    unsafe {
        env::remove_var("GOOGLE_API_KEY");
    }
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "");

    let result = AppConfig::load(Some(&path));
    assert!(
        matches!(result, Err(ConfigError::MissingEnv { ref name }) if name == "GOOGLE_API_KEY")
    );
}

#[test]
#[serial]
fn returns_error_when_output_path_blank() {
    set_credentials();
    unsafe {
        env::set_var("OUTPUT_IMAGE_PATH", "   ");
    }
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "");

    let result = AppConfig::load(Some(&path));
    assert!(
        matches!(result, Err(ConfigError::MissingEnv { ref name }) if name == "OUTPUT_IMAGE_PATH")
    );
}

#[test]
#[serial]
fn returns_parse_error_for_malformed_toml() {
    set_credentials();
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "bulk_threshold = [");

    let result = AppConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

#[test]
#[serial]
fn returns_error_for_zero_max_llm_calls() {
    set_credentials();
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "max_llm_calls = 0\n");

    let result = AppConfig::load(Some(&path));
    assert!(
        matches!(result, Err(ConfigError::Invalid { ref field, .. }) if field == "max_llm_calls")
    );
}

#[test]
#[serial]
fn loads_full_configuration() {
    set_credentials();
    let dir = tempdir().expect("tempdir");
    let path = write_config(
        dir.path(),
        r#"
app_name = "puppet_studio"
user_id = "operator"
model = "gemini-2.5-flash"
bulk_threshold = 2
max_llm_calls = 8

[retry]
attempts = 3
initial_delay_secs = 0.5
exp_base = 2.0
http_status_codes = [429, 503]

[image_server]
name = "images"
command = "uvx"
args = ["mcp-server-gemini-image-generator"]
timeout_secs = 90
"#,
    );

    let config = AppConfig::load(Some(&path)).expect("config loads");
    assert_eq!(config.app_name, "puppet_studio");
    assert_eq!(config.user_id, "operator");
    assert_eq!(config.model, "gemini-2.5-flash");
    assert_eq!(config.bulk_threshold, 2);
    assert_eq!(config.max_llm_calls, 8);
    assert_eq!(config.retry.attempts, 3);
    assert!(config.retry.retries_status(503));
    assert!(!config.retry.retries_status(500));
    assert_eq!(config.image_server.name, "images");
    assert_eq!(config.image_server.command, PathBuf::from("uvx"));
    assert_eq!(config.image_server.timeout, Duration::from_secs(90));
    assert_eq!(config.image_server.env["GEMINI_API_KEY"], "test-key");
    assert_eq!(
        config.image_server.env["OUTPUT_IMAGE_PATH"],
        "/tmp/coordinator-images"
    );
    assert_eq!(config.credentials.api_key, "test-key");
}

#[test]
#[serial]
fn debug_output_hides_api_key() {
    set_credentials();
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "");

    let config = AppConfig::load(Some(&path)).expect("config loads");
    let printed = format!("{:?}", config.credentials);
    assert!(!printed.contains("test-key"));
    assert!(printed.contains("redacted"));
}
