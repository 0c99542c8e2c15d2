//! JSON endpoints for the setup form and the watch log

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::error::{ErrorKind, SchedulerError};
use crate::models::{RegistrationRequest, SubmissionOutcome, WatchLogEntry};
use crate::service::RegistrationService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RegistrationService>,
}

#[derive(Debug, Serialize)]
struct WatchOption {
    name: String,
}

#[derive(Debug, Serialize)]
struct SubmissionResponse {
    #[serde(flatten)]
    outcome: SubmissionOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<&'static str>,
    message: &'static str,
}

impl IntoResponse for SchedulerError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::ExternalStore => StatusCode::BAD_GATEWAY,
            ErrorKind::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = json!({
            "error": self.kind().as_str(),
            "message": self.user_message(),
        });

        (status, Json(body)).into_response()
    }
}

pub fn router(service: Arc<RegistrationService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/projects", get(list_projects))
        .route("/api/projects/{project}/watches", get(list_watches))
        .route("/api/projects/{project}/registrations", get(watch_log))
        .route("/api/registrations", post(submit_registration))
        .with_state(AppState { service })
}

/// Bind `bind_address` and serve until the process is stopped
pub async fn serve(bind_address: SocketAddr, service: Arc<RegistrationService>) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind_address).await?;
    info!(address = %bind_address, "Registration server listening");
    axum::serve(listener, router(service)).await
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<String>>, SchedulerError> {
    Ok(Json(state.service.projects().await?))
}

async fn list_watches(
    State(state): State<AppState>,
    Path(project): Path<String>,
) -> Result<Json<Vec<WatchOption>>, SchedulerError> {
    let names = state.service.watch_options(&project).await?;
    Ok(Json(names.into_iter().map(|name| WatchOption { name }).collect()))
}

async fn watch_log(
    State(state): State<AppState>,
    Path(project): Path<String>,
) -> Result<Json<Vec<WatchLogEntry>>, SchedulerError> {
    Ok(Json(state.service.watch_log(&project).await?))
}

async fn submit_registration(
    State(state): State<AppState>,
    payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<Json<SubmissionResponse>, SchedulerError> {
    let Json(request) = payload.map_err(|rejection| {
        let err = SchedulerError::validation(rejection.body_text());
        state.service.metrics().record_error(err.kind());
        warn!(error = %err, "Rejected malformed registration body");
        err
    })?;

    let outcome = state.service.submit(&request).await?;
    Ok(Json(SubmissionResponse {
        outcome,
        notice: outcome.notice(),
        message: outcome.message(),
    }))
}
