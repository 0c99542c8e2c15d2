//! Comprehensive unit tests for config.rs module

use fitbit_scheduler::config::{AppConfig, CatalogConfig, LoggingConfig, ServerConfig, SheetConfig};
use std::io::Write;
use tempfile::NamedTempFile;

fn toml_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().expect("Failed to create temp file");
    file.write_all(contents.as_bytes()).expect("Failed to write config");
    file
}

#[test]
fn test_default_sheet_config() {
    let sheet = SheetConfig::default();

    assert_eq!(sheet.backend, "csv");
    assert_eq!(sheet.csv_path, "data/registrations.csv");
    assert_eq!(sheet.worksheet, "Sheet1");
    assert_eq!(sheet.spreadsheet_id, None);
    assert_eq!(sheet.access_token, None);
    assert_eq!(sheet.api_base_url, "https://sheets.googleapis.com");
    assert_eq!(sheet.request_timeout_secs, 30);
}

#[test]
fn test_default_catalog_logging_server() {
    let catalog = CatalogConfig::default();
    assert_eq!(catalog.backend, "sqlite");
    assert_eq!(catalog.database_path, "data/catalog.db");
    assert!(catalog.watches.is_empty());

    let logging = LoggingConfig::default();
    assert_eq!(logging.level, "info");
    assert_eq!(logging.file_path, None);
    assert_eq!(logging.format, "text");

    assert_eq!(ServerConfig::default().bind_address, "127.0.0.1:8080");
}

#[test]
fn test_validation_rejects_unknown_values() {
    let mut config = AppConfig::default();
    config.sheet.backend = "excel".to_string();
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.logging.level = "verbose".to_string();
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.logging.format = "xml".to_string();
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.sheet.csv_path = " ".to_string();
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.catalog.database_path = String::new();
    assert!(config.validate().is_err());
}

#[test]
fn test_static_catalog_needs_no_database_path() {
    let mut config = AppConfig::default();
    config.catalog.backend = "static".to_string();
    config.catalog.database_path = String::new();
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_explicit_file_overrides_defaults() {
    let file = toml_file(
        r#"
[sheet]
backend = "google"
spreadsheet_id = "1AbCdEf"
worksheet = "Nova log"

[catalog]
backend = "static"

[[catalog.watches]]
name = "nova-01"
token = "tok123"
project = "nova"

[[catalog.watches]]
name = "nova-02"
token = "tok456"
project = "nova"

[logging]
level = "debug"
"#,
    );

    let config = AppConfig::load(Some(file.path())).expect("Failed to load config");

    assert_eq!(config.sheet.backend, "google");
    assert_eq!(config.sheet.spreadsheet_id.as_deref(), Some("1AbCdEf"));
    assert_eq!(config.sheet.worksheet, "Nova log");
    assert_eq!(config.sheet.request_timeout_secs, 30);
    assert_eq!(config.catalog.backend, "static");
    assert_eq!(config.catalog.watches.len(), 2);
    assert_eq!(config.catalog.watches[1].token, "tok456");
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, "text");
}

#[test]
fn test_load_rejects_invalid_file() {
    let file = toml_file(
        r#"
[sheet]
backend = "google"
"#,
    );

    assert!(AppConfig::load(Some(file.path())).is_err());
}

#[test]
fn test_load_missing_explicit_file_fails() {
    let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
    assert!(AppConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
}
