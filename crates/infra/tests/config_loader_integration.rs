//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files and
//! building a client from the result.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use steadfast_infra::config::{self, ConfigLoadError};
use steadfast_infra::Client;
use tempfile::{Builder, NamedTempFile};

fn write_config(contents: &str, suffix: &str) -> NamedTempFile {
    let mut file = Builder::new()
        .prefix("steadfast")
        .suffix(suffix)
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(contents.as_bytes()).expect("Failed to write to temp file");
    file
}

#[test]
fn test_load_config_from_json_file() {
    let json_content = r#"{
        "circuit_breaker": {
            "enabled": true,
            "failure_threshold": 4,
            "reset_timeout": 15000,
            "half_open_success_needed": 1
        },
        "retry": {
            "max_attempts": 5,
            "initial_interval": 200,
            "max_interval": 5000,
            "multiplier": 3.0,
            "random_factor": 0.25
        },
        "server_error_threshold": 502,
        "transport": {
            "timeout": 10000,
            "user_agent": "integration-test"
        }
    }"#;

    let file = write_config(json_content, ".json");
    let config = config::load_from_file(Some(file.path().to_path_buf()))
        .expect("Failed to load config from JSON file");

    // Verify circuit breaker configuration
    assert!(config.circuit_breaker.enabled);
    assert_eq!(config.circuit_breaker.failure_threshold, 4);
    assert_eq!(config.circuit_breaker.reset_timeout, Duration::from_secs(15));
    assert_eq!(config.circuit_breaker.half_open_success_needed, 1);

    // Verify retry configuration
    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.retry.initial_interval, Duration::from_millis(200));
    assert_eq!(config.retry.max_interval, Duration::from_secs(5));
    assert!((config.retry.multiplier - 3.0).abs() < f64::EPSILON);
    assert!((config.retry.random_factor - 0.25).abs() < f64::EPSILON);

    // Verify transport configuration
    assert_eq!(config.server_error_threshold, 502);
    assert_eq!(config.transport.timeout, Duration::from_secs(10));
    assert_eq!(config.transport.user_agent.as_deref(), Some("integration-test"));
}

#[test]
fn test_load_config_from_toml_file() {
    let toml_content = r#"
server_error_threshold = 500

[circuit_breaker]
enabled = false

[retry]
enabled = true
max_attempts = 2
initial_interval = 50
max_interval = 400
"#;

    let file = write_config(toml_content, ".toml");
    let config = config::load_from_file(Some(file.path().to_path_buf()))
        .expect("Failed to load config from TOML file");

    assert!(!config.circuit_breaker.enabled);
    assert_eq!(config.circuit_breaker.failure_threshold, 5);
    assert_eq!(config.retry.max_attempts, 2);
    assert_eq!(config.retry.initial_interval, Duration::from_millis(50));
    assert_eq!(config.retry.max_interval, Duration::from_millis(400));
}

#[test]
fn test_loaded_config_builds_client() {
    let file = write_config(r#"{ "retry": { "max_attempts": 7 } }"#, ".json");
    let config = config::load_from_file(Some(file.path().to_path_buf())).expect("config");

    let client = Client::with_config(config).expect("client");
    assert_eq!(client.retry_strategy().max_attempts(), 7);
    assert_eq!(client.config().retry.max_attempts, 7);
}

#[test]
fn test_load_config_rejects_invalid_values() {
    let file = write_config(r#"{ "retry": { "max_attempts": 0 } }"#, ".json");
    let result = config::load_from_file(Some(file.path().to_path_buf()));
    assert!(matches!(result, Err(ConfigLoadError::Invalid(_))));
}

#[test]
fn test_load_config_malformed_toml() {
    let file = write_config("[retry\nmax_attempts = ", ".toml");
    let result = config::load_from_file(Some(file.path().to_path_buf()));
    assert!(matches!(result, Err(ConfigLoadError::Parse { format: "TOML", .. })));
}

#[test]
fn test_load_config_unsupported_extension() {
    let file = write_config("retry: {}", ".yaml");
    let result = config::load_from_file(Some(file.path().to_path_buf()));
    assert!(matches!(result, Err(ConfigLoadError::UnsupportedFormat(_))));
}

#[test]
fn test_load_config_missing_file() {
    let result = config::load_from_file(Some(PathBuf::from("/nonexistent/steadfast.toml")));
    assert!(matches!(result, Err(ConfigLoadError::NotFound(_))));
}
