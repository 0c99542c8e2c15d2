use crate::error::{Result, SchedulerError};
use crate::models::RegistrationRequest;

/// Lowest accepted failure threshold
pub const MIN_THRESHOLD: u32 = 1;
/// Highest accepted failure threshold
pub const MAX_THRESHOLD: u32 = 5;

/// Validation utilities for form input
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate email address
    pub fn validate_email(email: &str) -> Result<()> {
        if email.trim().is_empty() {
            return Err(SchedulerError::validation("Please enter your email address."));
        }

        if email.len() > 254 {
            return Err(SchedulerError::validation("Email too long (max 254 characters)"));
        }

        if email.chars().any(char::is_control) {
            return Err(SchedulerError::validation("Email contains invalid characters"));
        }

        Ok(())
    }

    /// Validate selected watch name
    pub fn validate_watch_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(SchedulerError::validation("Please select a watch."));
        }

        if name.len() > 100 {
            return Err(SchedulerError::validation("Watch name too long (max 100 characters)"));
        }

        if name.chars().any(char::is_control) {
            return Err(SchedulerError::validation("Watch name contains invalid characters"));
        }

        Ok(())
    }

    /// Validate selected project
    pub fn validate_project(project: &str) -> Result<()> {
        if project.trim().is_empty() {
            return Err(SchedulerError::validation("Please select a project."));
        }

        if project.chars().any(char::is_control) {
            return Err(SchedulerError::validation("Project contains invalid characters"));
        }

        Ok(())
    }

    /// Validate a failure threshold
    pub fn validate_threshold(label: &str, value: u32) -> Result<()> {
        if !(MIN_THRESHOLD..=MAX_THRESHOLD).contains(&value) {
            return Err(SchedulerError::validation(format!(
                "{label} must be between {MIN_THRESHOLD} and {MAX_THRESHOLD}, got {value}"
            )));
        }

        Ok(())
    }

    /// Validate a whole submission. Email is checked first.
    pub fn validate_request(request: &RegistrationRequest) -> Result<()> {
        Self::validate_email(&request.email)?;
        Self::validate_project(&request.project)?;
        Self::validate_watch_name(&request.watch_name)?;
        Self::validate_threshold("Fail threshold", request.fail_threshold)?;
        Self::validate_threshold("Fail threshold for EMA", request.fail_threshold_ema)?;

        if let Some(finish) = request.finish_date {
            if finish < chrono::Local::now().date_naive() {
                tracing::warn!(%finish, watch = %request.watch_name, "Finish date is in the past");
            }
        }

        Ok(())
    }
}
