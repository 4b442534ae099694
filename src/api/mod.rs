mod auth;
mod extract;
mod fetcher;
mod mongo;
mod posts;

use axum::Router;
use crate::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::routes(state.clone()))
        .nest("/posts", posts::routes(state))
        .nest("/fetcher", fetcher::routes())
        .nest("/mongo", mongo::routes())
}
