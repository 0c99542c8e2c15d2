//! Error types for the fitbit-scheduler library.
//!
//! This module provides custom error types using `thiserror`. Every error is
//! terminal for the submission that raised it; nothing here is retried.

use thiserror::Error;

/// Message shown to users when either external store misbehaves.
pub const STORE_UNAVAILABLE_MESSAGE: &str =
    "Could not reach the registration store. Please try again later.";

/// Errors that can occur while registering or listing watches.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Submitted form data was rejected before any store was touched
    #[error("{0}")]
    Validation(String),

    /// The selected watch is not in the project's catalog
    #[error("Watch '{watch}' not found in project '{project}'")]
    WatchNotFound {
        /// Project the lookup was scoped to
        project: String,
        /// Watch name that was submitted
        watch: String,
    },

    /// Registration sheet unreachable or returned something unusable
    #[error("Sheet error: {0}")]
    Sheet(String),

    /// Device catalog unreachable or returned something unusable
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// SQLite catalog errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// HTTP errors talking to the sheets API
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// CSV sheet read/write errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Broad classification used by the surfaces to pick a status and message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input, user can fix it
    Validation,
    /// Selected watch is unknown
    NotFound,
    /// Sheet or catalog failure
    ExternalStore,
    /// Process misconfigured
    Configuration,
}

impl ErrorKind {
    /// Label used for metrics and structured logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::ExternalStore => "external_store",
            Self::Configuration => "configuration",
        }
    }
}

impl SchedulerError {
    /// Shorthand for a validation failure
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for a malformed or failing sheet
    pub fn sheet(message: impl Into<String>) -> Self {
        Self::Sheet(message.into())
    }

    /// Shorthand for a failing catalog
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog(message.into())
    }

    /// Which kind of failure this is
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::WatchNotFound { .. } => ErrorKind::NotFound,
            Self::InvalidConfig(_) => ErrorKind::Configuration,
            Self::Sheet(_)
            | Self::Catalog(_)
            | Self::Database(_)
            | Self::Pool(_)
            | Self::Http(_)
            | Self::Csv(_)
            | Self::Io(_) => ErrorKind::ExternalStore,
        }
    }

    /// Text safe to show to the person filling in the form.
    ///
    /// Store failures collapse to a generic message; details go to the logs.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::ExternalStore => STORE_UNAVAILABLE_MESSAGE.to_string(),
            _ => self.to_string(),
        }
    }
}

/// Convenience type alias for Result with SchedulerError
pub type Result<T> = std::result::Result<T, SchedulerError>;
