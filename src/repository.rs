use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CatalogEntry, CellWrite, DeviceRegistration, SheetLayout, SheetSnapshot};

/// The shared registration sheet read by the external scheduler
#[async_trait]
pub trait RegistrationSheet: Send + Sync {
    /// Read the header and every data row
    async fn read_all(&self) -> Result<SheetSnapshot>;

    /// Append one row after the last data row
    async fn append_row(&self, layout: &SheetLayout, row: &DeviceRegistration) -> Result<()>;

    /// Overwrite cells of one row, addressed by its physical row number
    async fn write_cells(&self, layout: &SheetLayout, row_number: usize, writes: &[CellWrite]) -> Result<()>;
}

/// Project-scoped catalog of watches and their tokens
#[async_trait]
pub trait DeviceCatalog: Send + Sync {
    /// Watches whose project matches, ignoring case. Empty when none match.
    async fn watches_for_project(&self, project: &str) -> Result<Vec<CatalogEntry>>;

    /// Distinct project names
    async fn projects(&self) -> Result<Vec<String>>;
}
