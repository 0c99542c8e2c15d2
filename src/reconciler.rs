//! Registration reconciliation
//!
//! Decides whether a submission appends a new sheet row, updates an existing
//! one, or resets and updates it, and produces the exact writes. Pure: the
//! caller reads the snapshot and applies the result.

use serde::Serialize;

use crate::error::{Result, SchedulerError};
use crate::models::{CatalogEntry, CellWrite, DeviceRegistration, RegistrationRequest, SheetSnapshot};
use crate::schema::Column;
use crate::validation::InputValidator;

/// The single mutation a submission performs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Reconciliation {
    /// Append this row
    Create {
        /// Row to append
        row: DeviceRegistration,
    },
    /// Overwrite cells of an existing row
    Update {
        /// Physical sheet row to write
        row_number: usize,
        /// Telemetry and counters are cleared first
        reset: bool,
        /// Cells to write, in order
        writes: Vec<CellWrite>,
    },
}

/// Work out what a submission does to the sheet.
///
/// `catalog_entry` must be the catalog entry of `request.watch_name`; its
/// token is only used when a new row is created.
pub fn reconcile(
    request: &RegistrationRequest,
    snapshot: &SheetSnapshot,
    catalog_entry: &CatalogEntry,
) -> Result<Reconciliation> {
    InputValidator::validate_email(&request.email)?;

    if catalog_entry.name != request.watch_name {
        return Err(SchedulerError::WatchNotFound {
            project: catalog_entry.project.clone(),
            watch: request.watch_name.clone(),
        });
    }

    let desired = desired_row(request, catalog_entry);

    let Some(index) = snapshot.find(&request.watch_name, &request.email) else {
        return Ok(Reconciliation::Create { row: desired });
    };

    let mut writes = Vec::with_capacity(Column::EDITABLE.len() + Column::TELEMETRY.len() + Column::COUNTERS.len());
    if request.reset_prev_data {
        let cleared = DeviceRegistration::default();
        writes.extend(
            Column::TELEMETRY
                .iter()
                .chain(Column::COUNTERS.iter())
                .map(|c| CellWrite::from_row(&cleared, *c)),
        );
    }
    writes.extend(Column::EDITABLE.iter().map(|c| CellWrite::from_row(&desired, *c)));

    Ok(Reconciliation::Update {
        row_number: SheetSnapshot::row_number(index),
        reset: request.reset_prev_data,
        writes,
    })
}

/// Row a fresh registration for this request would have
fn desired_row(request: &RegistrationRequest, catalog_entry: &CatalogEntry) -> DeviceRegistration {
    DeviceRegistration {
        email: request.email.clone(),
        token: catalog_entry.token.clone(),
        watch_name: request.watch_name.clone(),
        morning_scan: request.morning_scan,
        noon_scan: request.noon_scan,
        evening_scan: request.evening_scan,
        fail_threshold: request.fail_threshold,
        ema_enabled: request.ema_enable,
        fail_threshold_ema: request.fail_threshold_ema,
        finish_date: request.finish_date,
        ..DeviceRegistration::default()
    }
}

impl Reconciliation {
    /// Apply this result to an in-memory snapshot, returning the row number touched
    pub fn apply_to(&self, snapshot: &mut SheetSnapshot) -> Result<usize> {
        match self {
            Self::Create { row } => {
                snapshot.rows.push(row.clone());
                Ok(SheetSnapshot::row_number(snapshot.rows.len() - 1))
            }
            Self::Update { row_number, writes, .. } => {
                let row = row_number
                    .checked_sub(crate::models::FIRST_DATA_ROW)
                    .and_then(|index| snapshot.rows.get_mut(index))
                    .ok_or_else(|| SchedulerError::sheet(format!("row {row_number} is outside the sheet")))?;
                row.apply(writes)?;
                Ok(*row_number)
            }
        }
    }
}
