use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use crate::models::CatalogEntry;

/// Application configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub sheet: SheetConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetConfig {
    pub backend: String, // "csv" or "google"
    pub csv_path: String,
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
    pub worksheet: String,
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub backend: String, // "sqlite" or "static"
    pub database_path: String,
    #[serde(default)]
    pub watches: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub file_path: Option<String>,
    pub format: String, // "json" or "text"
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            backend: "csv".to_string(),
            csv_path: "data/registrations.csv".to_string(),
            spreadsheet_id: None,
            worksheet: "Sheet1".to_string(),
            access_token: None,
            api_base_url: "https://sheets.googleapis.com".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            database_path: "data/catalog.db".to_string(),
            watches: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: None,
            format: "text".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

const SHEET_BACKENDS: [&str; 2] = ["csv", "google"];
const CATALOG_BACKENDS: [&str; 2] = ["sqlite", "static"];
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["text", "json"];

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// defaults, `config/default`, `config/local`, `explicit`, then
    /// `FITBIT_SCHEDULER_*` environment variables (`__` separates sections).
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = Self::with_defaults(Config::builder())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("FITBIT_SCHEDULER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("Failed to load configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;

        Ok(app_config)
    }

    fn with_defaults(builder: ConfigBuilder<DefaultState>) -> Result<ConfigBuilder<DefaultState>> {
        let defaults = AppConfig::default();
        let timeout = i64::try_from(defaults.sheet.request_timeout_secs)?;

        Ok(builder
            .set_default("sheet.backend", defaults.sheet.backend)?
            .set_default("sheet.csv_path", defaults.sheet.csv_path)?
            .set_default("sheet.worksheet", defaults.sheet.worksheet)?
            .set_default("sheet.api_base_url", defaults.sheet.api_base_url)?
            .set_default("sheet.request_timeout_secs", timeout)?
            .set_default("catalog.backend", defaults.catalog.backend)?
            .set_default("catalog.database_path", defaults.catalog.database_path)?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.format", defaults.logging.format)?
            .set_default("server.bind_address", defaults.server.bind_address)?)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !SHEET_BACKENDS.contains(&self.sheet.backend.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid sheet backend: {}. Must be one of: {:?}",
                self.sheet.backend,
                SHEET_BACKENDS
            ));
        }
        if self.sheet.backend == "csv" && self.sheet.csv_path.trim().is_empty() {
            return Err(anyhow::anyhow!("sheet.csv_path must be set for the csv backend"));
        }
        if self.sheet.backend == "google"
            && self.sheet.spreadsheet_id.as_deref().map_or(true, |id| id.trim().is_empty())
        {
            return Err(anyhow::anyhow!("sheet.spreadsheet_id must be set for the google backend"));
        }
        if self.sheet.worksheet.trim().is_empty() {
            return Err(anyhow::anyhow!("sheet.worksheet must not be empty"));
        }
        if self.sheet.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("request_timeout_secs must be greater than 0"));
        }

        if !CATALOG_BACKENDS.contains(&self.catalog.backend.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid catalog backend: {}. Must be one of: {:?}",
                self.catalog.backend,
                CATALOG_BACKENDS
            ));
        }
        if self.catalog.backend == "sqlite" && self.catalog.database_path.trim().is_empty() {
            return Err(anyhow::anyhow!("catalog.database_path must be set for the sqlite backend"));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                LOG_LEVELS
            ));
        }
        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                LOG_FORMATS
            ));
        }

        self.server
            .bind_address
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid server bind address: {}", self.server.bind_address))?;

        Ok(())
    }

    /// Get the Sheets access token from environment or config
    pub fn get_sheet_access_token(&self) -> Option<String> {
        std::env::var("GOOGLE_SHEETS_ACCESS_TOKEN")
            .ok()
            .or_else(|| self.sheet.access_token.clone())
            .filter(|token| !token.trim().is_empty())
    }

    /// Get catalog database path from environment or config
    pub fn get_catalog_database_path(&self) -> String {
        std::env::var("CATALOG_DATABASE_PATH").unwrap_or_else(|_| self.catalog.database_path.clone())
    }

    /// Get log level from environment or config
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }
}
