//! Store schema definitions
//!
//! Column names for the registration sheet and table/column names for the
//! SQLite device catalog. The sheet header strings are what the external
//! scheduler reads, so they must not change.

/// Columns of the registration sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    /// Contact email
    Email,
    /// Device auth token
    Token,
    /// Last time the scheduler touched the row
    LastUpdated,
    /// Watch name from the catalog
    WatchName,
    /// Last successful device sync
    LastSync,
    /// Last heart-rate reading
    LastHrValue,
    /// Last battery level
    LastBattery,
    /// Consecutive sync failures
    FailCount,
    /// Scan in the morning
    MorningScan,
    /// Scan at noon
    NoonScan,
    /// Scan in the evening
    EveningScan,
    /// Failures tolerated before alerting
    FailThreshold,
    /// EMA prompting enabled
    EmaEnabled,
    /// EMA failures tolerated before alerting
    FailThresholdEma,
    /// Consecutive EMA failures
    FailCountEma,
    /// Last EMA prompt
    LastEmaTime,
    /// Last day of scanning
    FinishDate,
}

impl Column {
    /// Canonical column order, used for appends and for new sheets
    pub const ALL: [Self; 17] = [
        Self::Email,
        Self::Token,
        Self::LastUpdated,
        Self::WatchName,
        Self::LastSync,
        Self::LastHrValue,
        Self::LastBattery,
        Self::FailCount,
        Self::MorningScan,
        Self::NoonScan,
        Self::EveningScan,
        Self::FailThreshold,
        Self::EmaEnabled,
        Self::FailThresholdEma,
        Self::FailCountEma,
        Self::LastEmaTime,
        Self::FinishDate,
    ];

    /// Columns written by the scheduler and cleared on reset
    pub const TELEMETRY: [Self; 5] = [
        Self::LastUpdated,
        Self::LastSync,
        Self::LastHrValue,
        Self::LastBattery,
        Self::LastEmaTime,
    ];

    /// Failure counters zeroed on reset
    pub const COUNTERS: [Self; 2] = [Self::FailCount, Self::FailCountEma];

    /// Columns a submission may overwrite on an existing row
    pub const EDITABLE: [Self; 8] = [
        Self::Email,
        Self::MorningScan,
        Self::NoonScan,
        Self::EveningScan,
        Self::FailThreshold,
        Self::EmaEnabled,
        Self::FailThresholdEma,
        Self::FinishDate,
    ];

    /// Columns shown in the per-project log view
    pub const DISPLAY: [Self; 12] = [
        Self::WatchName,
        Self::Email,
        Self::LastUpdated,
        Self::LastSync,
        Self::LastHrValue,
        Self::LastBattery,
        Self::FailCount,
        Self::MorningScan,
        Self::NoonScan,
        Self::EveningScan,
        Self::EmaEnabled,
        Self::FinishDate,
    ];

    /// Header text in the sheet
    #[must_use]
    pub const fn header(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Token => "token",
            Self::LastUpdated => "last updated",
            Self::WatchName => "watch name",
            Self::LastSync => "last sync",
            Self::LastHrValue => "last hr value",
            Self::LastBattery => "last battery",
            Self::FailCount => "fail count",
            Self::MorningScan => "morning_scan",
            Self::NoonScan => "noon_scan",
            Self::EveningScan => "evening_scan",
            Self::FailThreshold => "fail threshold",
            Self::EmaEnabled => "ema_enabled",
            Self::FailThresholdEma => "fail threshold ema",
            Self::FailCountEma => "fail count ema",
            Self::LastEmaTime => "last ema time",
            Self::FinishDate => "finish date",
        }
    }

    /// Look a column up by its header text (surrounding whitespace ignored)
    #[must_use]
    pub fn from_header(header: &str) -> Option<Self> {
        let header = header.trim();
        Self::ALL.into_iter().find(|c| c.header() == header)
    }

    /// Canonical header row
    #[must_use]
    pub fn header_row() -> Vec<String> {
        Self::ALL.iter().map(|c| c.header().to_string()).collect()
    }
}

impl serde::Serialize for Column {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.header())
    }
}

/// Spreadsheet column letters for a one-based column number (1 -> A, 27 -> AA)
#[must_use]
pub fn column_letters(mut number: usize) -> String {
    let mut letters = Vec::new();
    while number > 0 {
        let rem = (number - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        number = (number - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Device catalog table schema
pub mod watches {
    /// Table name
    pub const TABLE: &str = "watches";
    /// Watch name column
    pub const NAME: &str = "name";
    /// Device token column
    pub const TOKEN: &str = "token";
    /// Study project column
    pub const PROJECT: &str = "project";
}
