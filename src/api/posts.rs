use axum::{
    extract::{Path, State},
    middleware,
    routing::{get, put, MethodRouter},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::extract::{ApiJson, ApiQuery};
use crate::error::{AppError, Result};
use crate::middleware::{require_auth, CurrentUser};
use crate::models::{Comment, DateRange, PostResponse, PostUpdate};
use crate::AppState;

const DEFAULT_SEARCH_LIMIT: usize = 100;
const MAX_SEARCH_LIMIT: usize = 1000;

pub fn routes(state: AppState) -> Router<AppState> {
    let update: MethodRouter<AppState> = put(update_post).route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/count", get(count_posts))
        .route("/comments/search", get(search_comments))
        .route("/comments/:comment_id", get(get_comment))
        .route("/:post_id", get(get_post).merge(update))
        .route("/:post_id/comments", get(get_post_comments))
}

/// Path ids are external integer ids; negative or non-numeric values are rejected.
fn parse_id(raw: &str, name: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id >= 0)
        .ok_or_else(|| AppError::Validation(format!("{} must be a non-negative integer", name)))
}

async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<PostResponse>> {
    let post_id = parse_id(&post_id, "post_id")?;

    let post = state
        .store
        .find_post(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
    let comment_count = state.store.count_comments_by_post(post_id).await?;

    Ok(Json(PostResponse::new(post, comment_count)))
}

async fn get_post_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<Comment>>> {
    let post_id = parse_id(&post_id, "post_id")?;

    if !state.store.post_exists(post_id).await? {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    Ok(Json(state.store.find_comments_by_post(post_id).await?))
}

async fn get_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
) -> Result<Json<Comment>> {
    let comment_id = parse_id(&comment_id, "comment_id")?;

    let comment = state
        .store
        .find_comment(comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    Ok(Json(comment))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(alias = "query")]
    pub q: Option<String>,
    pub limit: Option<usize>,
}

async fn search_comments(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<Vec<Comment>>> {
    let text = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::Validation("Search query cannot be empty".to_string()))?;

    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    if !(1..=MAX_SEARCH_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {}",
            MAX_SEARCH_LIMIT
        )));
    }

    tracing::debug!(query = %text, limit, "Searching comments");
    Ok(Json(state.store.search_comments(text, limit).await?))
}

#[derive(Debug, Deserialize)]
pub struct CountQuery {
    #[serde(alias = "start_date")]
    pub from: Option<String>,
    #[serde(alias = "end_date")]
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
    #[serde(flatten)]
    pub range: DateRange,
}

async fn count_posts(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CountQuery>,
) -> Result<Json<CountResponse>> {
    let range = DateRange::parse(query.from.as_deref(), query.to.as_deref())?;
    let count = state.store.count_posts(range).await?;

    Ok(Json(CountResponse { count, range }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 500))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 5000))]
    pub body: Option<String>,
}

impl UpdatePostRequest {
    fn trimmed(self) -> Self {
        Self {
            title: self.title.map(|t| t.trim().to_string()),
            body: self.body.map(|b| b.trim().to_string()),
        }
    }
}

async fn update_post(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(post_id): Path<String>,
    ApiJson(payload): ApiJson<UpdatePostRequest>,
) -> Result<Json<PostResponse>> {
    let post_id = parse_id(&post_id, "post_id")?;

    let payload = payload.trimmed();
    payload.validate()?;

    let update = PostUpdate {
        title: payload.title,
        body: payload.body,
    };
    if update.is_empty() {
        return Err(AppError::Validation(
            "At least one of title or body is required".to_string(),
        ));
    }

    let post = state
        .store
        .update_post(post_id, update)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
    let comment_count = state.store.count_comments_by_post(post_id).await?;

    tracing::info!(post_id, user_id = current_user.user_id, "Post updated");

    Ok(Json(PostResponse::new(post, comment_count)))
}
