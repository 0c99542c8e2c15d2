//! Device catalog lookups
//!
//! A static catalog declared in configuration, plus helpers shared by every
//! catalog backend.

use async_trait::async_trait;

use crate::error::{Result, SchedulerError};
use crate::models::CatalogEntry;
use crate::repository::DeviceCatalog;

/// Catalog held in memory, usually loaded from the `catalog.watches` config list
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: Vec<CatalogEntry>,
}

impl StaticCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl DeviceCatalog for StaticCatalog {
    async fn watches_for_project(&self, project: &str) -> Result<Vec<CatalogEntry>> {
        let project = project.trim();
        let mut matches: Vec<CatalogEntry> = self
            .entries
            .iter()
            .filter(|e| e.project.eq_ignore_ascii_case(project))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(matches)
    }

    async fn projects(&self) -> Result<Vec<String>> {
        let mut projects: Vec<String> = Vec::new();
        for entry in &self.entries {
            if !projects.iter().any(|p| p.eq_ignore_ascii_case(&entry.project)) {
                projects.push(entry.project.clone());
            }
        }
        projects.sort_by_key(|p| p.to_lowercase());
        Ok(projects)
    }
}

/// Find the catalog entry of a watch within a project
pub async fn find_watch(catalog: &dyn DeviceCatalog, project: &str, watch_name: &str) -> Result<CatalogEntry> {
    catalog
        .watches_for_project(project)
        .await?
        .into_iter()
        .find(|e| e.name == watch_name)
        .ok_or_else(|| SchedulerError::WatchNotFound {
            project: project.to_string(),
            watch: watch_name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> StaticCatalog {
        StaticCatalog::new(vec![
            CatalogEntry { name: "nova-02".into(), token: "t2".into(), project: "nova".into() },
            CatalogEntry { name: "nova-01".into(), token: "t1".into(), project: "Nova".into() },
            CatalogEntry { name: "fibro-01".into(), token: "f1".into(), project: "fibro".into() },
        ])
    }

    #[tokio::test]
    async fn test_project_match_ignores_case() {
        let watches = catalog().watches_for_project("NOVA").await.unwrap();
        let names: Vec<&str> = watches.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["nova-01", "nova-02"]);
    }

    #[tokio::test]
    async fn test_unknown_project_is_empty_not_error() {
        assert!(catalog().watches_for_project("idf").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_projects_deduplicated() {
        let projects = catalog().projects().await.unwrap();
        assert_eq!(projects, vec!["fibro".to_string(), "nova".to_string()]);
    }

    #[tokio::test]
    async fn test_find_watch_scoped_to_project() {
        let catalog = catalog();
        assert_eq!(find_watch(&catalog, "nova", "nova-01").await.unwrap().token, "t1");
        let err = find_watch(&catalog, "fibro", "nova-01").await.unwrap_err();
        assert!(matches!(err, SchedulerError::WatchNotFound { .. }));
    }
}
