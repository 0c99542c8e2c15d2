//! SQLite device catalog

use fitbit_scheduler::catalog::find_watch;
use fitbit_scheduler::db::CatalogDatabase;
use fitbit_scheduler::error::SchedulerError;
use fitbit_scheduler::models::CatalogEntry;
use fitbit_scheduler::repository::DeviceCatalog;
use tempfile::TempDir;

fn entry(project: &str, name: &str, token: &str) -> CatalogEntry {
    CatalogEntry {
        name: name.to_string(),
        token: token.to_string(),
        project: project.to_string(),
    }
}

fn seeded(dir: &TempDir) -> CatalogDatabase {
    let path = dir.path().join("catalog.db");
    let db = CatalogDatabase::new(path.to_str().expect("utf-8 path")).expect("Failed to create database");
    db.add_watch(&entry("nova", "nova-02", "t2")).expect("add");
    db.add_watch(&entry("nova", "nova-01", "t1")).expect("add");
    db.add_watch(&entry("Fibro", "fibro-01", "f1")).expect("add");
    db
}

#[test]
fn test_database_creation_and_connection() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join("data").join("catalog.db");
    let db = CatalogDatabase::new(path.to_str().expect("utf-8 path")).expect("Failed to create database");
    let _conn = db.get_connection().expect("Failed to get database connection");
    assert!(path.exists());
}

#[tokio::test]
async fn test_watches_for_project_ignores_case() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let db = seeded(&dir);

    let watches = db.watches_for_project("NOVA").await.expect("lookup");
    let names: Vec<&str> = watches.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["nova-01", "nova-02"]);

    assert_eq!(db.watches_for_project("fibro").await.expect("lookup").len(), 1);
    assert!(db.watches_for_project("idf").await.expect("lookup").is_empty());
}

#[tokio::test]
async fn test_add_watch_replaces_token() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let db = seeded(&dir);
    db.add_watch(&entry("nova", "nova-01", "rotated")).expect("add");

    let watch = find_watch(&db, "nova", "nova-01").await.expect("find");
    assert_eq!(watch.token, "rotated");
    assert_eq!(db.watches_for_project("nova").await.expect("lookup").len(), 2);
}

#[tokio::test]
async fn test_projects_are_distinct_and_sorted() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let db = seeded(&dir);
    assert_eq!(db.projects().await.expect("projects"), vec!["Fibro", "nova"]);
}

#[tokio::test]
async fn test_find_watch_outside_project() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let db = seeded(&dir);
    let err = find_watch(&db, "fibro", "nova-01").await.unwrap_err();
    assert!(matches!(err, SchedulerError::WatchNotFound { .. }));
}

#[test]
fn test_reopen_keeps_entries() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    drop(seeded(&dir));
    let path = dir.path().join("catalog.db");
    let db = CatalogDatabase::new(path.to_str().expect("utf-8 path")).expect("reopen");
    assert_eq!(db.get_watches("nova").expect("lookup").len(), 2);
}
