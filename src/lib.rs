//! Fitbit Scheduler Setup - wearable registration for sync scanning
//!
//! Registers study watches in the shared registration sheet read by the
//! external sync scheduler, and shows the registrations of a project.
//!
//! # Features
//!
//! - Create, update or reset one sheet row per watch and email
//! - Project-scoped watch catalog (SQLite or static configuration)
//! - Registration sheet as a CSV file or a Google spreadsheet
//! - JSON endpoints and a command line front end

/// Device catalog lookups
pub mod catalog;
/// Configuration management
pub mod config;
/// CSV registration sheet
pub mod csv_sheet;
/// SQLite device catalog
pub mod db;
/// Error types
pub mod error;
/// Google Sheets registration sheet
pub mod google_sheet;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Create/update/reset decision
pub mod reconciler;
/// Store traits
pub mod repository;
/// Sheet columns and catalog table names
pub mod schema;
/// HTTP endpoints
pub mod server;
/// Registration workflow
pub mod service;
/// Input validation
pub mod validation;

// Re-export key components for easier access
pub use catalog::StaticCatalog;
pub use csv_sheet::CsvSheet;
pub use db::CatalogDatabase;
pub use error::{Result, SchedulerError};
pub use google_sheet::GoogleSheet;
pub use models::{CatalogEntry, DeviceRegistration, RegistrationRequest, SubmissionOutcome, WatchLogEntry};
pub use service::RegistrationService;
