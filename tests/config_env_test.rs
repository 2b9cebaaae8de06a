//! Config environment variable tests
//!
//! These tests verify that Config::from_env() correctly reads and applies
//! environment variable overrides. Config::from_env() also loads a .env file
//! via dotenvy, so each test sets every variable it asserts on.
//!
//! Tests use #[serial] to prevent race conditions with shared env vars.

use probability_compass::config::{
    Config, HistoryBackend, LogFormat, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL,
};
use probability_compass::history::HistoryLedger;
use probability_compass::{AppError, AppState};
use serial_test::serial;
use std::env;

fn set_key() {
    env::set_var("GEMINI_API_KEY", "test-key");
}

#[test]
#[serial]
fn test_blank_api_key_loads_as_none() {
    env::set_var("GEMINI_API_KEY", "   ");

    let config = Config::from_env().unwrap();
    assert!(config.gemini.api_key.is_none());

    set_key();
}

#[tokio::test]
#[serial]
async fn test_missing_api_key_fails_app_state_but_not_ledger() {
    env::set_var("GEMINI_API_KEY", "");
    env::set_var("HISTORY_BACKEND", "memory");

    let config = Config::from_env().unwrap();
    let err = AppState::from_config(config.clone()).await.err().unwrap();
    assert!(matches!(err, AppError::Config { .. }));
    assert!(err.to_string().contains("GEMINI_API_KEY"));

    let ledger = HistoryLedger::from_config(&config).await.unwrap();
    assert!(ledger.list().await.unwrap().is_empty());

    env::remove_var("HISTORY_BACKEND");
    set_key();
}

#[test]
#[serial]
fn test_gemini_defaults() {
    set_key();
    env::remove_var("GEMINI_BASE_URL");
    env::remove_var("GEMINI_MODEL");
    env::remove_var("GEMINI_TEMPERATURE");

    let config = Config::from_env().unwrap();
    assert_eq!(config.gemini.api_key.as_deref(), Some("test-key"));
    assert_eq!(config.gemini.base_url, DEFAULT_GEMINI_BASE_URL);
    assert_eq!(config.gemini.model, DEFAULT_GEMINI_MODEL);
    assert!((config.gemini.temperature - 0.4).abs() < f32::EPSILON);
}

#[test]
#[serial]
fn test_gemini_overrides() {
    set_key();
    env::set_var("GEMINI_BASE_URL", "http://localhost:9999");
    env::set_var("GEMINI_MODEL", "gemini-2.5-pro");
    env::set_var("GEMINI_TEMPERATURE", "0.1");

    let config = Config::from_env().unwrap();
    assert_eq!(config.gemini.base_url, "http://localhost:9999");
    assert_eq!(config.gemini.model, "gemini-2.5-pro");
    assert!((config.gemini.temperature - 0.1).abs() < f32::EPSILON);

    env::remove_var("GEMINI_BASE_URL");
    env::remove_var("GEMINI_MODEL");
    env::remove_var("GEMINI_TEMPERATURE");
}

#[test]
#[serial]
fn test_custom_database() {
    set_key();
    env::set_var("DATABASE_PATH", "/custom/history.db");
    env::set_var("DATABASE_MAX_CONNECTIONS", "10");

    let config = Config::from_env().unwrap();
    assert_eq!(config.database.path.to_str().unwrap(), "/custom/history.db");
    assert_eq!(config.database.max_connections, 10);

    env::set_var("DATABASE_PATH", "./data/history.db");
    env::set_var("DATABASE_MAX_CONNECTIONS", "5");
}

#[test]
#[serial]
fn test_history_backend_selection() {
    set_key();

    env::set_var("HISTORY_BACKEND", "MEMORY");
    assert_eq!(Config::from_env().unwrap().history.backend, HistoryBackend::Memory);

    env::set_var("HISTORY_BACKEND", "sqlite");
    assert_eq!(Config::from_env().unwrap().history.backend, HistoryBackend::Sqlite);

    // unknown values fall back to sqlite
    env::set_var("HISTORY_BACKEND", "redis");
    assert_eq!(Config::from_env().unwrap().history.backend, HistoryBackend::Sqlite);

    env::remove_var("HISTORY_BACKEND");
}

#[test]
#[serial]
fn test_json_log_format() {
    set_key();
    env::set_var("LOG_FORMAT", "json");

    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.format, LogFormat::Json);

    env::set_var("LOG_FORMAT", "pretty");
}

#[test]
#[serial]
fn test_request_and_chat_settings() {
    set_key();
    env::set_var("REQUEST_TIMEOUT_MS", "1500");
    env::set_var("CHAT_MAX_TURNS", "10");

    let config = Config::from_env().unwrap();
    assert_eq!(config.request.timeout_ms, 1500);
    assert_eq!(config.chat.max_turns, 10);

    env::set_var("CHAT_MAX_TURNS", "not-a-number");
    assert_eq!(Config::from_env().unwrap().chat.max_turns, 6);

    env::remove_var("REQUEST_TIMEOUT_MS");
    env::remove_var("CHAT_MAX_TURNS");
}
