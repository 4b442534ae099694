use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::error::Result;
use crate::models::StoreDump;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/all", get(get_all_records))
        .route("/clear", get(clear_all_data))
}

async fn get_all_records(State(state): State<AppState>) -> Result<Json<StoreDump>> {
    let (posts, comments) = state.store.list_all().await?;
    Ok(Json(StoreDump::new(posts, comments)))
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub message: &'static str,
    pub deleted_count: u64,
    pub deleted_posts: u64,
    pub deleted_comments: u64,
}

async fn clear_all_data(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    let summary = state.store.delete_all().await?;
    tracing::warn!(
        deleted_posts = summary.deleted_posts,
        deleted_comments = summary.deleted_comments,
        "Cleared all stored data"
    );

    Ok(Json(ClearResponse {
        message: "All data cleared successfully",
        deleted_count: summary.total(),
        deleted_posts: summary.deleted_posts,
        deleted_comments: summary.deleted_comments,
    }))
}
