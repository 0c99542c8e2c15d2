//! Registration sheet stored in a Google spreadsheet, through the Sheets v4
//! values API. The access token is an opaque secret from configuration.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::SheetConfig;
use crate::error::{Result, SchedulerError};
use crate::models::{CellWrite, DeviceRegistration, SheetLayout, SheetSnapshot};
use crate::repository::RegistrationSheet;
use crate::schema::column_letters;

/// Values are written exactly as given, never parsed by Sheets
const VALUE_INPUT_OPTION: &str = "RAW";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

pub struct GoogleSheet {
    client: Client,
    base_url: Url,
    spreadsheet_id: String,
    worksheet: String,
    access_token: String,
}

impl GoogleSheet {
    pub fn new(config: &SheetConfig, access_token: String) -> Result<Self> {
        let spreadsheet_id = config
            .spreadsheet_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| SchedulerError::InvalidConfig("sheet.spreadsheet_id is required for the google backend".into()))?;

        if access_token.trim().is_empty() {
            return Err(SchedulerError::InvalidConfig("an access token is required for the google backend".into()));
        }

        let base_url = Url::parse(&config.api_base_url)
            .map_err(|e| SchedulerError::InvalidConfig(format!("invalid sheet.api_base_url: {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            spreadsheet_id,
            worksheet: config.worksheet.clone(),
            access_token,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| SchedulerError::InvalidConfig("sheet.api_base_url cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Worksheet name as it must appear in A1 notation
    fn worksheet_range(&self) -> String {
        let plain = self.worksheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if plain {
            self.worksheet.clone()
        } else {
            format!("'{}'", self.worksheet.replace('\'', "''"))
        }
    }

    fn range(&self, cells: &str) -> String {
        format!("{}!{cells}", self.worksheet_range())
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => if *b { "True" } else { "False" }.to_string(),
        other => other.to_string(),
    }
}

#[async_trait]
impl RegistrationSheet for GoogleSheet {
    async fn read_all(&self) -> Result<SheetSnapshot> {
        let range = self.worksheet_range();
        let url = self.url(&["v4", "spreadsheets", &self.spreadsheet_id, "values", &range])?;

        let body: ValueRange = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let records: Vec<Vec<String>> = body
            .values
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();

        let Some((header, rows)) = records.split_first() else {
            return Err(SchedulerError::sheet(format!("worksheet '{}' has no header row", self.worksheet)));
        };

        debug!(rows = rows.len(), "Read registration sheet");
        SheetSnapshot::from_records(header, rows)
    }

    async fn append_row(&self, layout: &SheetLayout, row: &DeviceRegistration) -> Result<()> {
        let target = format!("{}:append", self.range("A1"));
        let mut url = self.url(&["v4", "spreadsheets", &self.spreadsheet_id, "values", &target])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", VALUE_INPUT_OPTION)
            .append_pair("insertDataOption", "INSERT_ROWS");

        self.client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "values": [row.to_record_for(layout)] }))
            .send()
            .await?
            .error_for_status()?;

        debug!(watch = %row.watch_name, "Appended row to registration sheet");
        Ok(())
    }

    async fn write_cells(&self, layout: &SheetLayout, row_number: usize, writes: &[CellWrite]) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }

        let data: Vec<Value> = writes
            .iter()
            .map(|w| {
                let cell = format!("{}{row_number}", column_letters(layout.column_number(w.column)));
                json!({ "range": self.range(&cell), "values": [[w.value]] })
            })
            .collect();

        let url = self.url(&["v4", "spreadsheets", &self.spreadsheet_id, "values:batchUpdate"])?;

        self.client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "valueInputOption": VALUE_INPUT_OPTION, "data": data }))
            .send()
            .await?
            .error_for_status()?;

        debug!(row_number, cells = writes.len(), "Updated registration sheet row");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(worksheet: &str) -> GoogleSheet {
        let config = SheetConfig {
            worksheet: worksheet.to_string(),
            spreadsheet_id: Some("abc".to_string()),
            ..SheetConfig::default()
        };
        GoogleSheet::new(&config, "secret".to_string()).unwrap()
    }

    #[test]
    fn test_plain_worksheet_range() {
        assert_eq!(sheet("Sheet1").range("B7"), "Sheet1!B7");
    }

    #[test]
    fn test_quoted_worksheet_range() {
        assert_eq!(sheet("Nova log").range("A1"), "'Nova log'!A1");
        assert_eq!(sheet("Bob's").worksheet_range(), "'Bob''s'");
    }

    #[test]
    fn test_missing_spreadsheet_id_rejected() {
        let config = SheetConfig::default();
        assert!(GoogleSheet::new(&config, "secret".to_string()).is_err());
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&json!("x")), "x");
        assert_eq!(cell_text(&json!(3)), "3");
        assert_eq!(cell_text(&json!(true)), "True");
        assert_eq!(cell_text(&Value::Null), "");
    }
}
