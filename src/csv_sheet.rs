//! Registration sheet kept as a CSV file on disk.
//!
//! The first record is the header. Appends and cell writes both rewrite the
//! whole file through a temporary file and a rename, so readers never see a
//! half-written sheet and a last line without a terminator stays its own row.
//! File work runs on the blocking thread pool.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{Result, SchedulerError};
use crate::models::{CellWrite, DeviceRegistration, SheetLayout, SheetSnapshot};
use crate::repository::RegistrationSheet;
use crate::schema::Column;

pub struct CsvSheet {
    file: Arc<SheetFile>,
}

struct SheetFile {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvSheet {
    /// Open a sheet, creating it with the canonical header if it does not exist
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            let mut writer = csv::Writer::from_path(&path)?;
            writer.write_record(Column::header_row())?;
            writer.flush()?;
            info!(path = %path.display(), "Created registration sheet");
        }

        Ok(Self {
            file: Arc::new(SheetFile {
                path,
                write_lock: Mutex::new(()),
            }),
        })
    }

    /// Location of the sheet file
    pub fn path(&self) -> &Path {
        &self.file.path
    }

    async fn run<T, F>(&self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&SheetFile) -> Result<T> + Send + 'static,
    {
        let file = Arc::clone(&self.file);
        tokio::task::spawn_blocking(move || work(&file))
            .await
            .map_err(|e| SchedulerError::sheet(format!("sheet worker failed: {e}")))?
    }
}

impl SheetFile {
    fn read_records(&self) -> Result<Vec<Vec<String>>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)?;

        let mut records = Vec::new();
        for record in reader.records() {
            let record = record?;
            records.push(record.iter().map(ToString::to_string).collect());
        }
        Ok(records)
    }

    fn write_records(&self, records: &[Vec<String>]) -> Result<()> {
        let tmp_path = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::WriterBuilder::new().flexible(true).from_path(&tmp_path)?;
            for record in records {
                writer.write_record(record)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| SchedulerError::sheet("sheet write lock poisoned"))
    }

    fn snapshot(&self) -> Result<SheetSnapshot> {
        let records = self.read_records()?;
        let Some((header, rows)) = records.split_first() else {
            return Err(SchedulerError::sheet(format!("{} has no header row", self.path.display())));
        };
        SheetSnapshot::from_records(header, rows)
    }

    fn append(&self, record: Vec<String>) -> Result<()> {
        let _guard = self.lock()?;

        let mut records = self.read_records()?;
        if records.is_empty() {
            return Err(SchedulerError::sheet(format!("{} has no header row", self.path.display())));
        }
        records.push(record);
        self.write_records(&records)
    }

    fn write_row(&self, layout: &SheetLayout, row_number: usize, writes: &[CellWrite]) -> Result<()> {
        let _guard = self.lock()?;

        let mut records = self.read_records()?;
        let record = row_number
            .checked_sub(1)
            .filter(|index| *index > 0)
            .and_then(|index| records.get_mut(index))
            .ok_or_else(|| SchedulerError::sheet(format!("row {row_number} is outside the sheet")))?;

        if record.len() < layout.width() {
            record.resize(layout.width(), String::new());
        }
        for write in writes {
            record[layout.index(write.column)].clone_from(&write.value);
        }

        self.write_records(&records)
    }
}

#[async_trait]
impl RegistrationSheet for CsvSheet {
    async fn read_all(&self) -> Result<SheetSnapshot> {
        self.run(SheetFile::snapshot).await
    }

    async fn append_row(&self, layout: &SheetLayout, row: &DeviceRegistration) -> Result<()> {
        let record = row.to_record_for(layout);
        self.run(move |file| file.append(record)).await?;

        debug!(watch = %row.watch_name, "Appended row to CSV sheet");
        Ok(())
    }

    async fn write_cells(&self, layout: &SheetLayout, row_number: usize, writes: &[CellWrite]) -> Result<()> {
        let layout = layout.clone();
        let owned = writes.to_vec();
        self.run(move |file| file.write_row(&layout, row_number, &owned)).await?;

        debug!(row_number, cells = writes.len(), "Rewrote CSV sheet row");
        Ok(())
    }
}
