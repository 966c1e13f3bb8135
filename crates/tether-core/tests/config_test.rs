//! Tests for the Tether configuration system.

use std::sync::Mutex;
use std::time::Duration;

use tether_core::config::TetherConfig;
use tether_core::errors::ConfigError;

/// Serializes tests that touch environment variables.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn clear_tether_env_vars() {
    for key in [
        "TETHER_CACHE_CAPACITY",
        "TETHER_COMPILER_MAX_GRAMMAR_EXPANSION",
        "TETHER_COMPILER_REGEX_SIZE_LIMIT",
        "TETHER_DISPATCH_MAX_ATTEMPTS",
        "TETHER_DISPATCH_INITIAL_BACKOFF_MS",
        "TETHER_DISPATCH_MAX_BACKOFF_MS",
        "TETHER_DISPATCH_REQUEST_TIMEOUT_MS",
        "TETHER_DISPATCH_MAX_CONCURRENCY",
        "TETHER_DISPATCH_JITTER",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_without_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_tether_env_vars();

    let config = TetherConfig::load(None).unwrap();
    assert_eq!(config.cache.effective_capacity(), 256);
    assert_eq!(config.dispatch.effective_max_attempts(), 3);
    assert_eq!(config.dispatch.effective_initial_backoff(), Duration::from_millis(100));
    assert_eq!(config.dispatch.effective_max_backoff(), Duration::from_secs(5));
    assert_eq!(config.dispatch.effective_request_timeout(), Duration::from_secs(30));
    assert_eq!(config.dispatch.effective_max_concurrency(), 8);
    assert!(config.dispatch.effective_jitter());
    assert_eq!(config.compiler.effective_max_grammar_expansion(), 256);
}

#[test]
fn env_overrides_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_tether_env_vars();

    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("tether.toml");
    std::fs::write(
        &path,
        r#"
[cache]
capacity = 32

[dispatch]
max_attempts = 5
jitter = false
"#,
    )
    .unwrap();

    std::env::set_var("TETHER_DISPATCH_MAX_ATTEMPTS", "7");
    let config = TetherConfig::load(Some(&path)).unwrap();

    assert_eq!(config.cache.capacity, Some(32));
    assert_eq!(config.dispatch.max_attempts, Some(7));
    assert_eq!(config.dispatch.jitter, Some(false));

    clear_tether_env_vars();
}

#[test]
fn unparseable_env_value_is_ignored() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_tether_env_vars();

    std::env::set_var("TETHER_CACHE_CAPACITY", "lots");
    let config = TetherConfig::load(None).unwrap();
    assert_eq!(config.cache.capacity, None);

    clear_tether_env_vars();
}

#[test]
fn missing_file_is_reported() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_tether_env_vars();

    let dir = tempfile::TempDir::new().unwrap();
    let err = TetherConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound { .. }));
}

#[test]
fn invalid_toml_is_a_parse_error() {
    let err = TetherConfig::from_toml("[cache\ncapacity = ").unwrap_err();
    assert!(matches!(err, ConfigError::ParseError { .. }));
}

#[test]
fn validation_rejects_degenerate_values() {
    let cases = [
        ("[cache]\ncapacity = 0", "cache.capacity"),
        ("[dispatch]\nmax_attempts = 0", "dispatch.max_attempts"),
        ("[dispatch]\nmax_concurrency = 0", "dispatch.max_concurrency"),
        ("[dispatch]\nrequest_timeout_ms = 0", "dispatch.request_timeout_ms"),
        (
            "[dispatch]\ninitial_backoff_ms = 900\nmax_backoff_ms = 100",
            "dispatch.initial_backoff_ms",
        ),
    ];
    for (toml, expected_field) in cases {
        let config = TetherConfig::from_toml(toml).unwrap();
        match TetherConfig::validate(&config) {
            Err(ConfigError::ValidationFailed { field, .. }) => assert_eq!(field, expected_field),
            other => panic!("{toml}: expected validation failure, got {other:?}"),
        }
    }
}

#[test]
fn toml_roundtrip_preserves_overrides() {
    let config = TetherConfig::from_toml("[dispatch]\nmax_backoff_ms = 1200").unwrap();
    let rendered = config.to_toml().unwrap();
    let back = TetherConfig::from_toml(&rendered).unwrap();
    assert_eq!(back.dispatch.max_backoff_ms, Some(1200));
    assert_eq!(back.cache.capacity, None);
}
