use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::catalog::find_watch;
use crate::error::Result;
use crate::logging::OperationTimer;
use crate::metrics::SchedulerMetrics;
use crate::models::{RegistrationRequest, SheetSnapshot, SubmissionOutcome, WatchLogEntry};
use crate::reconciler::{reconcile, Reconciliation};
use crate::repository::{DeviceCatalog, RegistrationSheet};
use crate::validation::InputValidator;

/// What a submission would do, without doing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionPreview {
    pub outcome: SubmissionOutcome,
    pub mutation: Reconciliation,
}

pub struct RegistrationService {
    sheet: Box<dyn RegistrationSheet>,
    catalog: Box<dyn DeviceCatalog>,
    metrics: SchedulerMetrics,
}

impl RegistrationService {
    pub fn new(sheet: Box<dyn RegistrationSheet>, catalog: Box<dyn DeviceCatalog>) -> Self {
        Self {
            sheet,
            catalog,
            metrics: SchedulerMetrics::default(),
        }
    }

    /// Metrics shared by every surface of this service
    pub const fn metrics(&self) -> &SchedulerMetrics {
        &self.metrics
    }

    /// Register or update one watch. Performs at most one sheet mutation.
    #[instrument(skip_all, fields(project = %request.project, watch = %request.watch_name))]
    pub async fn submit(&self, request: &RegistrationRequest) -> Result<SubmissionOutcome> {
        let timer = OperationTimer::new("submit_registration");

        match self.execute(request).await {
            Ok(outcome) => {
                let duration = timer.finish();
                self.metrics.record_submission(&outcome, duration);
                if let Some(notice) = outcome.notice() {
                    warn!(row_number = outcome.row_number(), "{notice}");
                }
                info!(action = outcome.label(), row_number = outcome.row_number(), "{}", outcome.message());
                Ok(outcome)
            }
            Err(e) => {
                self.metrics.record_error(e.kind());
                warn!(kind = e.kind().as_str(), error = %e, "Submission rejected");
                Err(e)
            }
        }
    }

    /// Work out what `submit` would do, reading but never writing the sheet
    pub async fn preview(&self, request: &RegistrationRequest) -> Result<SubmissionPreview> {
        let (snapshot, mutation) = self.plan(request).await?;
        Ok(SubmissionPreview {
            outcome: outcome_of(&mutation, &snapshot),
            mutation,
        })
    }

    async fn execute(&self, request: &RegistrationRequest) -> Result<SubmissionOutcome> {
        let (snapshot, mutation) = self.plan(request).await?;
        let outcome = outcome_of(&mutation, &snapshot);

        match &mutation {
            Reconciliation::Create { row } => {
                self.sheet.append_row(&snapshot.layout, row).await?;
            }
            Reconciliation::Update { row_number, writes, .. } => {
                self.sheet.write_cells(&snapshot.layout, *row_number, writes).await?;
            }
        }

        Ok(outcome)
    }

    /// Validate, resolve the watch in its project, then read and reconcile.
    /// Nothing is read from the sheet until the request is known to be valid.
    async fn plan(&self, request: &RegistrationRequest) -> Result<(SheetSnapshot, Reconciliation)> {
        let request = request.normalized();
        InputValidator::validate_request(&request)?;

        let entry = find_watch(self.catalog.as_ref(), &request.project, &request.watch_name).await?;
        let snapshot = self.sheet.read_all().await?;
        let mutation = reconcile(&request, &snapshot, &entry)?;

        Ok((snapshot, mutation))
    }

    /// Watch names offered for a project, sorted
    pub async fn watch_options(&self, project: &str) -> Result<Vec<String>> {
        let project = project.trim();
        InputValidator::validate_project(project)?;

        Ok(self
            .catalog
            .watches_for_project(project)
            .await?
            .into_iter()
            .map(|e| e.name)
            .collect())
    }

    /// Known study projects
    pub async fn projects(&self) -> Result<Vec<String>> {
        self.catalog.projects().await
    }

    /// Registrations of a project's watches, in sheet order
    pub async fn watch_log(&self, project: &str) -> Result<Vec<WatchLogEntry>> {
        let names: HashSet<String> = self.watch_options(project).await?.into_iter().collect();
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let snapshot = self.sheet.read_all().await?;
        Ok(snapshot
            .rows
            .iter()
            .filter(|row| names.contains(&row.watch_name))
            .map(WatchLogEntry::from)
            .collect())
    }
}

fn outcome_of(mutation: &Reconciliation, snapshot: &SheetSnapshot) -> SubmissionOutcome {
    match mutation {
        Reconciliation::Create { .. } => SubmissionOutcome::Created {
            row_number: SheetSnapshot::row_number(snapshot.rows.len()),
        },
        Reconciliation::Update { row_number, reset: true, .. } => SubmissionOutcome::Reset { row_number: *row_number },
        Reconciliation::Update { row_number, reset: false, .. } => {
            SubmissionOutcome::Updated { row_number: *row_number }
        }
    }
}
