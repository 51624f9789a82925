use ptero_provisioner::config::{Config, ConfigError};
use std::env;
use std::sync::Mutex;

// Use a mutex to serialize tests that modify environment variables
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn setup_required_env() {
    env::set_var("PTERO_TEST_MODE", "1");
    env::set_var("DATABASE_URL", "postgres://localhost/test");
    env::set_var("JWT_SECRET", "test_jwt_secret");
}

fn cleanup_env() {
    env::remove_var("PTERO_TEST_MODE");
    env::remove_var("DATABASE_URL");
    env::remove_var("JWT_SECRET");
    env::remove_var("HOST");
    env::remove_var("PORT");
    env::remove_var("BILLING_WEBHOOK_SECRET");
    env::remove_var("PANEL_REQUEST_TIMEOUT_SECS");
    env::remove_var("GUEST_RATE_LIMIT_PER_MINUTE");
}

#[test]
fn test_config_from_env_with_all_required() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env();
    setup_required_env();

    let config = Config::from_env().expect("Failed to load config");

    assert_eq!(config.database_url, "postgres://localhost/test");
    assert_eq!(config.jwt_secret, "test_jwt_secret");
    assert_eq!(config.host, "0.0.0.0"); // Default
    assert_eq!(config.port, 8080); // Default
    assert_eq!(config.billing_webhook_secret, None);
    assert_eq!(config.panel_request_timeout_secs, 30);
    assert_eq!(config.guest_rate_limit_per_minute, 30);

    cleanup_env();
}

#[test]
fn test_config_from_env_with_custom_values() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env();
    setup_required_env();

    env::set_var("HOST", "127.0.0.1");
    env::set_var("PORT", "3000");
    env::set_var("BILLING_WEBHOOK_SECRET", "whsec_custom");
    env::set_var("PANEL_REQUEST_TIMEOUT_SECS", "10");
    env::set_var("GUEST_RATE_LIMIT_PER_MINUTE", "120");

    let config = Config::from_env().expect("Failed to load config");

    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.port, 3000);
    assert_eq!(config.billing_webhook_secret.as_deref(), Some("whsec_custom"));
    assert_eq!(config.panel_request_timeout_secs, 10);
    assert_eq!(config.guest_rate_limit_per_minute, 120);
    assert_eq!(config.server_addr(), "127.0.0.1:3000");

    cleanup_env();
}

#[test]
fn test_config_empty_webhook_secret_disables_events() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env();
    setup_required_env();
    env::set_var("BILLING_WEBHOOK_SECRET", "");

    let config = Config::from_env().expect("Failed to load config");
    assert!(config.billing_webhook_secret.is_none());

    cleanup_env();
}

#[test]
fn test_config_missing_database_url() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env();
    env::set_var("PTERO_TEST_MODE", "1");
    env::set_var("JWT_SECRET", "test_jwt_secret");

    let result = Config::from_env();
    assert!(result.is_err());
    match result.unwrap_err() {
        ConfigError::MissingVar(var) => assert_eq!(var, "DATABASE_URL"),
        other => panic!("Expected MissingVar error, got {:?}", other),
    }

    cleanup_env();
}

#[test]
fn test_config_missing_jwt_secret() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env();
    env::set_var("PTERO_TEST_MODE", "1");
    env::set_var("DATABASE_URL", "postgres://localhost/test");

    match Config::from_env() {
        Err(ConfigError::MissingVar(var)) => assert_eq!(var, "JWT_SECRET"),
        other => panic!("Expected MissingVar error, got {:?}", other),
    }

    cleanup_env();
}

#[test]
fn test_config_invalid_port() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env();
    setup_required_env();
    env::set_var("PORT", "not_a_number");

    let result = Config::from_env();
    assert!(result.is_err());
    match result.unwrap_err() {
        ConfigError::InvalidValue { var, .. } => assert_eq!(var, "PORT"),
        other => panic!("Expected InvalidValue error, got {:?}", other),
    }

    cleanup_env();
}

#[test]
fn test_config_zero_guest_rate_limit() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env();
    setup_required_env();
    env::set_var("GUEST_RATE_LIMIT_PER_MINUTE", "0");

    match Config::from_env() {
        Err(ConfigError::InvalidValue { var, message }) => {
            assert_eq!(var, "GUEST_RATE_LIMIT_PER_MINUTE");
            assert_eq!(message, "must be greater than zero");
        }
        other => panic!("Expected InvalidValue error, got {:?}", other),
    }

    cleanup_env();
}
