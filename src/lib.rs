//! Posts ingestion service
//!
//! Periodically pulls posts and comments from a JSONPlaceholder-style source
//! API into a document store and serves them over a small REST API.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::db::PostStore;
use crate::services::{AuthService, Fetcher, Ingestor, PostSource};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PostStore>,
    pub fetcher: Fetcher,
    pub auth: AuthService,
    pub config: Config,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn PostStore>,
        source: Arc<dyn PostSource>,
    ) -> anyhow::Result<Self> {
        let auth = AuthService::new(&config.jwt)?;
        let ingestor = Ingestor::new(source, store.clone(), &config.fetcher);
        let fetcher = Fetcher::new(
            Arc::new(ingestor),
            Duration::from_secs(config.fetcher.interval_seconds),
        );

        Ok(Self {
            store,
            fetcher,
            auth,
            config,
        })
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(api::routes(state.clone()))
        .layer(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
