use axum::{
    extract::State,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::extract::ApiJson;
use crate::error::Result;
use crate::middleware::{require_auth, CurrentUser};
use crate::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route(
            "/me",
            get(get_current_user).route_layer(middleware::from_fn_with_state(state, require_auth)),
        )
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(range(min = 1))]
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    pub user_id: i64,
}

/// Development login: issues a token for any positive user id, no credentials.
async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    payload.validate()?;

    let issued = state.auth.issue(payload.user_id)?;
    tracing::info!(user_id = payload.user_id, "Issued access token");

    Ok(Json(LoginResponse {
        access_token: issued.access_token,
        token_type: "bearer",
        expires_in: issued.expires_in,
    }))
}

async fn get_current_user(
    Extension(current_user): Extension<CurrentUser>,
) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse {
        user_id: current_user.user_id,
    })
}
