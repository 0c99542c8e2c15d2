use metrics::{counter, histogram};
use std::time::Duration;

use crate::error::ErrorKind;
use crate::models::SubmissionOutcome;

/// Names of the metrics emitted by the registration service.
///
/// Nothing is exported unless the embedding process installs a recorder.
#[derive(Debug, Clone)]
pub struct SchedulerMetrics {
    pub submissions_total: &'static str,
    pub submission_duration: &'static str,
    pub errors_total: &'static str,
}

impl Default for SchedulerMetrics {
    fn default() -> Self {
        Self {
            submissions_total: "fitbit_scheduler_submissions_total",
            submission_duration: "fitbit_scheduler_submission_duration_seconds",
            errors_total: "fitbit_scheduler_errors_total",
        }
    }
}

impl SchedulerMetrics {
    /// Record a successful submission and how long it took
    pub fn record_submission(&self, outcome: &SubmissionOutcome, duration: Duration) {
        counter!(self.submissions_total, "outcome" => outcome.label()).increment(1);
        histogram!(self.submission_duration).record(duration.as_secs_f64());
    }

    /// Record a failed operation by error kind
    pub fn record_error(&self, kind: ErrorKind) {
        counter!(self.errors_total, "kind" => kind.as_str()).increment(1);
    }
}
