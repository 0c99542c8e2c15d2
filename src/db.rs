use std::fs;
use std::path::Path;

use async_trait::async_trait;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, Row};
use tracing::debug;

use crate::error::{Result, SchedulerError};
use crate::models::CatalogEntry;
use crate::repository::DeviceCatalog;
use crate::schema::watches;

// Type alias for the database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// SQLite-backed device catalog. Clones share one pool.
#[derive(Clone)]
pub struct CatalogDatabase {
    pool: DbPool,
}

impl CatalogDatabase {
    /// Open (or create) the catalog database and run migrations
    pub fn new(database_path: &str) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(database_path);
        let pool = Pool::builder().build(manager)?;

        let conn = pool.get()?;
        Self::run_migrations(&conn)?;

        debug!(path = database_path, "Catalog database ready");
        Ok(Self { pool })
    }

    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(include_str!("../migrations/2026-10-01-000000_create_watches/up.sql"))?;
        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    /// Insert a watch, replacing the token if the watch already exists in the project
    pub fn add_watch(&self, entry: &CatalogEntry) -> Result<()> {
        let conn = self.get_connection()?;
        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}) VALUES (?, ?, ?) ON CONFLICT ({}, {}) DO UPDATE SET {} = excluded.{}",
                watches::TABLE,
                watches::NAME,
                watches::TOKEN,
                watches::PROJECT,
                watches::PROJECT,
                watches::NAME,
                watches::TOKEN,
                watches::TOKEN
            ),
            params![entry.name, entry.token, entry.project],
        )?;
        Ok(())
    }

    /// Watches of a project, case-insensitive on the project name
    pub fn get_watches(&self, project: &str) -> Result<Vec<CatalogEntry>> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {}, {}, {} FROM {} WHERE lower({}) = lower(?) ORDER BY {}",
            watches::NAME,
            watches::TOKEN,
            watches::PROJECT,
            watches::TABLE,
            watches::PROJECT,
            watches::NAME
        ))?;

        let entries = stmt
            .query_map(params![project.trim()], Self::map_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    /// Distinct project names, sorted without regard to case
    pub fn get_projects(&self) -> Result<Vec<String>> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT {} FROM {} ORDER BY {} COLLATE NOCASE",
            watches::PROJECT,
            watches::TABLE,
            watches::PROJECT
        ))?;

        let projects = stmt
            .query_map(params![], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(projects)
    }

    fn map_entry(row: &Row) -> rusqlite::Result<CatalogEntry> {
        Ok(CatalogEntry {
            name: row.get(0)?,
            token: row.get(1)?,
            project: row.get(2)?,
        })
    }
}

impl CatalogDatabase {
    /// Run a pooled query on the blocking thread pool
    async fn run<T, F>(&self, query: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Self) -> Result<T> + Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || query(&db))
            .await
            .map_err(|e| SchedulerError::catalog(format!("catalog worker failed: {e}")))?
    }
}

#[async_trait]
impl DeviceCatalog for CatalogDatabase {
    async fn watches_for_project(&self, project: &str) -> Result<Vec<CatalogEntry>> {
        let project = project.to_string();
        self.run(move |db| db.get_watches(&project)).await
    }

    async fn projects(&self) -> Result<Vec<String>> {
        self.run(Self::get_projects).await
    }
}
