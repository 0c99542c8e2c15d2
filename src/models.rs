//! Data models for watch registration
//!
//! The typed sheet row, the submitted request, catalog entries and the
//! snapshot the reconciler works on.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};
use crate::schema::Column;

/// Sheet row number of the first data row (header is row 1, rows are one-based)
pub const FIRST_DATA_ROW: usize = 2;

/// Date format written to the `finish date` column
pub const FINISH_DATE_FORMAT: &str = "%Y-%m-%d";

/// One row of the registration sheet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRegistration {
    /// Contact email
    pub email: String,
    /// Device auth token, set once at creation
    pub token: String,
    /// Scheduler bookkeeping timestamp
    pub last_updated: String,
    /// Watch name from the catalog
    pub watch_name: String,
    /// Last successful sync
    pub last_sync: String,
    /// Last heart-rate reading
    pub last_hr_value: String,
    /// Last battery level
    pub last_battery: String,
    /// Consecutive sync failures
    pub fail_count: u32,
    /// Scan in the morning
    pub morning_scan: bool,
    /// Scan at noon
    pub noon_scan: bool,
    /// Scan in the evening
    pub evening_scan: bool,
    /// Sync failures tolerated before alerting
    pub fail_threshold: u32,
    /// EMA prompting enabled
    pub ema_enabled: bool,
    /// EMA failures tolerated before alerting
    pub fail_threshold_ema: u32,
    /// Consecutive EMA failures
    pub fail_count_ema: u32,
    /// Last EMA prompt
    pub last_ema_time: String,
    /// Last day of scanning, if any
    pub finish_date: Option<NaiveDate>,
}

impl DeviceRegistration {
    /// Encoded value of one column, as written to the sheet
    #[must_use]
    pub fn cell(&self, column: Column) -> String {
        match column {
            Column::Email => self.email.clone(),
            Column::Token => self.token.clone(),
            Column::LastUpdated => self.last_updated.clone(),
            Column::WatchName => self.watch_name.clone(),
            Column::LastSync => self.last_sync.clone(),
            Column::LastHrValue => self.last_hr_value.clone(),
            Column::LastBattery => self.last_battery.clone(),
            Column::FailCount => self.fail_count.to_string(),
            Column::MorningScan => encode_bool(self.morning_scan),
            Column::NoonScan => encode_bool(self.noon_scan),
            Column::EveningScan => encode_bool(self.evening_scan),
            Column::FailThreshold => self.fail_threshold.to_string(),
            Column::EmaEnabled => encode_bool(self.ema_enabled),
            Column::FailThresholdEma => self.fail_threshold_ema.to_string(),
            Column::FailCountEma => self.fail_count_ema.to_string(),
            Column::LastEmaTime => self.last_ema_time.clone(),
            Column::FinishDate => encode_date(self.finish_date),
        }
    }

    /// Decode a sheet cell into the matching field
    pub fn set_cell(&mut self, column: Column, value: &str) -> Result<()> {
        match column {
            Column::Email => self.email = value.to_string(),
            Column::Token => self.token = value.to_string(),
            Column::LastUpdated => self.last_updated = value.to_string(),
            Column::WatchName => self.watch_name = value.to_string(),
            Column::LastSync => self.last_sync = value.to_string(),
            Column::LastHrValue => self.last_hr_value = value.to_string(),
            Column::LastBattery => self.last_battery = value.to_string(),
            Column::FailCount => self.fail_count = decode_count(column, value)?,
            Column::MorningScan => self.morning_scan = decode_bool(value),
            Column::NoonScan => self.noon_scan = decode_bool(value),
            Column::EveningScan => self.evening_scan = decode_bool(value),
            Column::FailThreshold => self.fail_threshold = decode_count(column, value)?,
            Column::EmaEnabled => self.ema_enabled = decode_bool(value),
            Column::FailThresholdEma => self.fail_threshold_ema = decode_count(column, value)?,
            Column::FailCountEma => self.fail_count_ema = decode_count(column, value)?,
            Column::LastEmaTime => self.last_ema_time = value.to_string(),
            Column::FinishDate => self.finish_date = decode_date(value)?,
        }
        Ok(())
    }

    /// Row in canonical column order
    #[must_use]
    pub fn to_record(&self) -> Vec<String> {
        Column::ALL.iter().map(|c| self.cell(*c)).collect()
    }

    /// Row laid out for a sheet whose header may be in any order
    #[must_use]
    pub fn to_record_for(&self, layout: &SheetLayout) -> Vec<String> {
        let mut record = vec![String::new(); layout.width()];
        for column in Column::ALL {
            record[layout.index(column)] = self.cell(column);
        }
        record
    }

    /// Parse a raw sheet row; missing trailing cells read as empty
    pub fn from_record(layout: &SheetLayout, record: &[String]) -> Result<Self> {
        let mut row = Self::default();
        for column in Column::ALL {
            let value = record.get(layout.index(column)).map_or("", String::as_str);
            row.set_cell(column, value.trim())?;
        }
        Ok(row)
    }

    /// Apply cell writes in order
    pub fn apply(&mut self, writes: &[CellWrite]) -> Result<()> {
        for write in writes {
            self.set_cell(write.column, &write.value)?;
        }
        Ok(())
    }
}

fn encode_bool(value: bool) -> String {
    if value { "True" } else { "False" }.to_string()
}

fn decode_bool(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

fn encode_date(value: Option<NaiveDate>) -> String {
    value.map(|d| d.format(FINISH_DATE_FORMAT).to_string()).unwrap_or_default()
}

fn decode_count(column: Column, value: &str) -> Result<u32> {
    if value.is_empty() {
        return Ok(0);
    }
    value
        .parse()
        .map_err(|_| SchedulerError::sheet(format!("column '{}' holds non-numeric value '{value}'", column.header())))
}

fn decode_date(value: &str) -> Result<Option<NaiveDate>> {
    if value.is_empty() {
        return Ok(None);
    }
    // Sheets renders typed dates in the locale format
    NaiveDate::parse_from_str(value, FINISH_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(value, "%m/%d/%Y"))
        .map(Some)
        .map_err(|_| SchedulerError::sheet(format!("column 'finish date' holds invalid date '{value}'")))
}

/// Where each known column sits in an actual sheet header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    width: usize,
    positions: Vec<usize>,
}

impl SheetLayout {
    /// Layout of a sheet created with the canonical header
    #[must_use]
    pub fn canonical() -> Self {
        Self {
            width: Column::ALL.len(),
            positions: (0..Column::ALL.len()).collect(),
        }
    }

    /// Build a layout from a header row; every known column must be present
    pub fn from_header(header: &[String]) -> Result<Self> {
        let mut positions = vec![usize::MAX; Column::ALL.len()];
        for (index, name) in header.iter().enumerate() {
            if let Some(column) = Column::from_header(name) {
                if positions[column as usize] == usize::MAX {
                    positions[column as usize] = index;
                }
            }
        }

        let missing: Vec<&str> = Column::ALL
            .iter()
            .filter(|c| positions[**c as usize] == usize::MAX)
            .map(|c| c.header())
            .collect();
        if !missing.is_empty() {
            return Err(SchedulerError::sheet(format!("sheet header is missing columns: {}", missing.join(", "))));
        }

        Ok(Self { width: header.len(), positions })
    }

    /// Zero-based position of a column
    #[must_use]
    pub fn index(&self, column: Column) -> usize {
        self.positions[column as usize]
    }

    /// One-based column number, as spreadsheets address it
    #[must_use]
    pub fn column_number(&self, column: Column) -> usize {
        self.index(column) + 1
    }

    /// Number of header cells
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }
}

/// Full contents of the registration sheet at read time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSnapshot {
    /// Column positions of the sheet
    pub layout: SheetLayout,
    /// Data rows in sheet order
    pub rows: Vec<DeviceRegistration>,
}

impl SheetSnapshot {
    /// Snapshot of a sheet with only the canonical header
    #[must_use]
    pub fn empty() -> Self {
        Self {
            layout: SheetLayout::canonical(),
            rows: Vec::new(),
        }
    }

    /// Parse a header row plus data rows
    pub fn from_records(header: &[String], records: &[Vec<String>]) -> Result<Self> {
        let layout = SheetLayout::from_header(header)?;
        let rows = records
            .iter()
            .map(|r| DeviceRegistration::from_record(&layout, r))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { layout, rows })
    }

    /// Index of the first row registered for this watch AND this email
    #[must_use]
    pub fn find(&self, watch_name: &str, email: &str) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.watch_name == watch_name && row.email == email)
    }

    /// Physical sheet row number of a data row index
    #[must_use]
    pub const fn row_number(index: usize) -> usize {
        index + FIRST_DATA_ROW
    }
}

/// One cell to overwrite on an existing row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellWrite {
    /// Target column
    pub column: Column,
    /// Encoded value
    pub value: String,
}

impl CellWrite {
    /// Write of `column` taking its value from `row`
    #[must_use]
    pub fn from_row(row: &DeviceRegistration, column: Column) -> Self {
        Self { column, value: row.cell(column) }
    }
}

const fn default_threshold() -> u32 {
    3
}

/// What the coordinator submitted on the setup form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    /// Study project scoping the watch list
    pub project: String,
    /// Selected watch
    pub watch_name: String,
    /// Contact email
    #[serde(default)]
    pub email: String,
    /// Scan in the morning
    #[serde(default)]
    pub morning_scan: bool,
    /// Scan at noon
    #[serde(default)]
    pub noon_scan: bool,
    /// Scan in the evening
    #[serde(default)]
    pub evening_scan: bool,
    /// Sync failures tolerated (1-5)
    #[serde(default = "default_threshold")]
    pub fail_threshold: u32,
    /// Enable EMA prompting
    #[serde(default)]
    pub ema_enable: bool,
    /// EMA failures tolerated (1-5)
    #[serde(default = "default_threshold")]
    pub fail_threshold_ema: u32,
    /// Last day of scanning
    #[serde(default)]
    pub finish_date: Option<NaiveDate>,
    /// Clear telemetry and counters of an existing registration
    #[serde(default)]
    pub reset_prev_data: bool,
}

impl RegistrationRequest {
    /// Request with defaults matching the form's initial state
    #[must_use]
    pub fn new(project: &str, watch_name: &str, email: &str) -> Self {
        Self {
            project: project.to_string(),
            watch_name: watch_name.to_string(),
            email: email.to_string(),
            morning_scan: false,
            noon_scan: false,
            evening_scan: false,
            fail_threshold: default_threshold(),
            ema_enable: false,
            fail_threshold_ema: default_threshold(),
            finish_date: None,
            reset_prev_data: false,
        }
    }

    /// Copy with surrounding whitespace stripped from the text fields
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            project: self.project.trim().to_string(),
            watch_name: self.watch_name.trim().to_string(),
            email: self.email.trim().to_string(),
            ..self.clone()
        }
    }
}

/// A watch known to the device catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Watch name
    pub name: String,
    /// Device auth token
    pub token: String,
    /// Study project the watch belongs to
    pub project: String,
}

/// What a submission did to the sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    /// New row appended
    Created {
        /// Sheet row of the new registration
        row_number: usize,
    },
    /// Editable fields of an existing row overwritten
    Updated {
        /// Sheet row that was changed
        row_number: usize,
    },
    /// Existing row reset and then updated
    Reset {
        /// Sheet row that was changed
        row_number: usize,
    },
}

impl SubmissionOutcome {
    /// Sheet row that was written
    #[must_use]
    pub const fn row_number(&self) -> usize {
        match self {
            Self::Created { row_number } | Self::Updated { row_number } | Self::Reset { row_number } => *row_number,
        }
    }

    /// Label used in logs and metrics
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Updated { .. } => "updated",
            Self::Reset { .. } => "reset",
        }
    }

    /// Warning shown before the success message, if any
    #[must_use]
    pub const fn notice(&self) -> Option<&'static str> {
        match self {
            Self::Created { .. } => None,
            Self::Updated { .. } => Some("This watch is already registered. Updating existing entry."),
            Self::Reset { .. } => Some("This watch is already registered. Resetting existing entry."),
        }
    }

    /// Success message
    #[must_use]
    pub const fn message(&self) -> &'static str {
        "Your preferences have been saved successfully!"
    }
}

/// Registration as shown in the per-project log view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchLogEntry {
    /// Watch name
    pub watch_name: String,
    /// Contact email
    pub email: String,
    /// Scheduler bookkeeping timestamp
    pub last_updated: String,
    /// Last successful sync
    pub last_sync: String,
    /// Last heart-rate reading
    pub last_hr_value: String,
    /// Last battery level
    pub last_battery: String,
    /// Consecutive sync failures
    pub fail_count: u32,
    /// Scan in the morning
    pub morning_scan: bool,
    /// Scan at noon
    pub noon_scan: bool,
    /// Scan in the evening
    pub evening_scan: bool,
    /// EMA prompting enabled
    pub ema_enabled: bool,
    /// Last day of scanning
    pub finish_date: Option<NaiveDate>,
}

impl WatchLogEntry {
    /// Cells in display column order, encoded as in the sheet
    #[must_use]
    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.watch_name.clone(),
            self.email.clone(),
            self.last_updated.clone(),
            self.last_sync.clone(),
            self.last_hr_value.clone(),
            self.last_battery.clone(),
            self.fail_count.to_string(),
            encode_bool(self.morning_scan),
            encode_bool(self.noon_scan),
            encode_bool(self.evening_scan),
            encode_bool(self.ema_enabled),
            encode_date(self.finish_date),
        ]
    }
}

impl From<&DeviceRegistration> for WatchLogEntry {
    fn from(row: &DeviceRegistration) -> Self {
        Self {
            watch_name: row.watch_name.clone(),
            email: row.email.clone(),
            last_updated: row.last_updated.clone(),
            last_sync: row.last_sync.clone(),
            last_hr_value: row.last_hr_value.clone(),
            last_battery: row.last_battery.clone(),
            fail_count: row.fail_count,
            morning_scan: row.morning_scan,
            noon_scan: row.noon_scan,
            evening_scan: row.evening_scan,
            ema_enabled: row.ema_enabled,
            finish_date: row.finish_date,
        }
    }
}
