use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::services::FetcherStatus;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/start", get(start_fetcher))
        .route("/stop", get(stop_fetcher))
        .route("/status", get(get_status))
}

#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub message: &'static str,
    pub running: bool,
}

async fn start_fetcher(State(state): State<AppState>) -> Json<ControlResponse> {
    let message = if state.fetcher.start().await {
        "Fetcher started successfully"
    } else {
        "Fetcher is already running"
    };

    Json(ControlResponse {
        message,
        running: state.fetcher.is_running().await,
    })
}

async fn stop_fetcher(State(state): State<AppState>) -> Json<ControlResponse> {
    let message = if state.fetcher.stop().await {
        "Fetcher stopped successfully"
    } else {
        "Fetcher is not running"
    };

    Json(ControlResponse {
        message,
        running: state.fetcher.is_running().await,
    })
}

async fn get_status(State(state): State<AppState>) -> Json<FetcherStatus> {
    Json(state.fetcher.status().await)
}
