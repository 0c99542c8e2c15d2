//! JSON endpoints over a CSV sheet and a static catalog

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use fitbit_scheduler::csv_sheet::CsvSheet;
use fitbit_scheduler::server::router;
use fitbit_scheduler::{CatalogEntry, RegistrationService, StaticCatalog};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

fn app(dir: &TempDir) -> Router {
    let sheet = CsvSheet::open(dir.path().join("sheet.csv")).expect("Failed to open sheet");
    let catalog = StaticCatalog::new(vec![
        CatalogEntry {
            name: "nova-01".to_string(),
            token: "tok123".to_string(),
            project: "nova".to_string(),
        },
        CatalogEntry {
            name: "fibro-01".to_string(),
            token: "tokf".to_string(),
            project: "fibro".to_string(),
        },
    ]);
    router(Arc::new(RegistrationService::new(Box::new(sheet), Box::new(catalog))))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("request failed");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn test_health() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let (status, body) = send(app(&dir), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_projects_and_watches_hide_tokens() {
    let dir = TempDir::new().expect("Failed to create temp directory");

    let (status, body) = send(app(&dir), get("/api/projects")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["fibro", "nova"]));

    let (status, body) = send(app(&dir), get("/api/projects/NOVA/watches")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{ "name": "nova-01" }]));
    assert!(!body.to_string().contains("tok123"));
}

#[tokio::test]
async fn test_submit_then_update() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let request = json!({
        "project": "nova",
        "watch_name": "nova-01",
        "email": "a@x.com",
        "morning_scan": true,
        "finish_date": "2026-12-31"
    });

    let (status, body) = send(app(&dir), post_json("/api/registrations", &request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["action"], "created");
    assert_eq!(body["row_number"], 2);
    assert_eq!(body["message"], "Your preferences have been saved successfully!");
    assert!(body.get("notice").is_none());

    let (status, body) = send(app(&dir), post_json("/api/registrations", &request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["action"], "updated");
    assert_eq!(body["notice"], "This watch is already registered. Updating existing entry.");

    let (status, body) = send(app(&dir), get("/api/projects/nova/registrations")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["watch_name"], "nova-01");
    assert_eq!(body[0]["morning_scan"], true);
    assert_eq!(body[0]["finish_date"], "2026-12-31");
    assert!(body[0].get("token").is_none());
}

#[tokio::test]
async fn test_empty_email_is_unprocessable() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let request = json!({ "project": "nova", "watch_name": "nova-01", "email": "" });

    let (status, body) = send(app(&dir), post_json("/api/registrations", &request)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Please enter your email address.");
}

#[tokio::test]
async fn test_unknown_watch_is_not_found() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let request = json!({ "project": "nova", "watch_name": "fibro-01", "email": "a@x.com" });

    let (status, body) = send(app(&dir), post_json("/api/registrations", &request)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_broken_sheet_is_bad_gateway_with_generic_message() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let router = app(&dir);
    std::fs::write(dir.path().join("sheet.csv"), "not,a,registration,sheet\n").expect("write");

    let request = json!({ "project": "nova", "watch_name": "nova-01", "email": "a@x.com" });
    let (status, body) = send(router, post_json("/api/registrations", &request)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["message"], "Could not reach the registration store. Please try again later.");
    assert!(!body.to_string().contains("missing columns"));
}

#[tokio::test]
async fn test_malformed_body_is_validation_error() {
    let dir = TempDir::new().expect("Failed to create temp directory");

    // Missing project
    let request = json!({ "watch_name": "nova-01", "email": "a@x.com" });
    let (status, body) = send(app(&dir), post_json("/api/registrations", &request)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation");
    assert!(body["message"].as_str().is_some_and(|m| m.contains("project")));

    // Finish date in the wrong format
    let request = json!({
        "project": "nova",
        "watch_name": "nova-01",
        "email": "a@x.com",
        "finish_date": "31/12/2026"
    });
    let (status, body) = send(app(&dir), post_json("/api/registrations", &request)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation");

    // Not JSON at all
    let raw = Request::builder()
        .method("POST")
        .uri("/api/registrations")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let (status, body) = send(app(&dir), raw).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation");

    // Nothing was written
    let (_, body) = send(app(&dir), get("/api/projects/nova/registrations")).await;
    assert_eq!(body, json!([]));
}
