//! Scheduler lifecycle endpoints.

use axum::extract::State;
use axum::Json;
use dispatch_core::{StartOutcome, StopOutcome};
use serde::Serialize;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub running: bool,
}

/// `POST /api/v1/scheduler/start`
pub async fn start_handler(State(app_state): State<AppState>) -> Json<MessageResponse> {
    let message = match app_state.scheduler().start() {
        StartOutcome::Started => "Scheduler started",
        StartOutcome::AlreadyRunning => "Scheduler already running",
    };
    Json(MessageResponse { message })
}

/// `POST /api/v1/scheduler/stop`
pub async fn stop_handler(State(app_state): State<AppState>) -> Json<MessageResponse> {
    let message = match app_state.scheduler().stop() {
        StopOutcome::Stopped => "Scheduler stopped",
        StopOutcome::AlreadyStopped => "Scheduler already stopped",
    };
    Json(MessageResponse { message })
}

/// `GET /api/v1/scheduler/status`
pub async fn status_handler(State(app_state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        running: app_state.scheduler().is_running(),
    })
}
