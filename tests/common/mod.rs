#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use posts_ingest_service::config::{
    Config, DatabaseConfig, FetcherConfig, JwtConfig, ServerConfig, SourceConfig, StoreBackend,
};
use posts_ingest_service::db::{MemoryStore, PostStore};
use posts_ingest_service::error::{AppError, Result};
use posts_ingest_service::services::{PostSource, SourceComment, SourcePost};
use posts_ingest_service::{app, AppState};

pub const TEST_SECRET: &str = "integration-test-secret";

/// In-memory source API whose contents and failures tests can script.
#[derive(Default)]
pub struct ScriptedSource {
    posts: Mutex<Vec<SourcePost>>,
    comments: Mutex<HashMap<i64, Vec<SourceComment>>>,
    failing_comment_posts: Mutex<HashSet<i64>>,
    posts_unavailable: Mutex<bool>,
    comment_calls: Mutex<Vec<i64>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_post(&self, id: i64, title: &str, body: &str, comment_count: usize) {
        self.posts.lock().unwrap().push(SourcePost {
            id,
            user_id: 1,
            title: title.to_string(),
            body: body.to_string(),
        });

        let comments = (0..comment_count)
            .map(|n| {
                let comment_id = id * 100 + n as i64;
                SourceComment {
                    id: comment_id,
                    post_id: id,
                    name: format!("commenter {}", comment_id),
                    email: format!("user{}@example.com", comment_id),
                    body: format!("comment {} on post {}", comment_id, id),
                }
            })
            .collect();
        self.comments.lock().unwrap().insert(id, comments);
    }

    pub fn fail_comments_for(&self, post_id: i64) {
        self.failing_comment_posts.lock().unwrap().insert(post_id);
    }

    pub fn set_posts_unavailable(&self, unavailable: bool) {
        *self.posts_unavailable.lock().unwrap() = unavailable;
    }

    pub fn comment_calls(&self) -> Vec<i64> {
        self.comment_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PostSource for ScriptedSource {
    async fn list_posts(&self) -> Result<Vec<SourcePost>> {
        if *self.posts_unavailable.lock().unwrap() {
            return Err(AppError::Upstream("source returned 503".to_string()));
        }
        Ok(self.posts.lock().unwrap().clone())
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<SourceComment>> {
        self.comment_calls.lock().unwrap().push(post_id);
        if self.failing_comment_posts.lock().unwrap().contains(&post_id) {
            return Err(AppError::Upstream(format!("comments for {} unavailable", post_id)));
        }
        Ok(self
            .comments
            .lock()
            .unwrap()
            .get(&post_id)
            .cloned()
            .unwrap_or_default())
    }
}

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            backend: StoreBackend::Memory,
            url: "mongodb://localhost:27017".to_string(),
            name: "posts_service_test".to_string(),
        },
        source: SourceConfig {
            base_url: "http://localhost:9".to_string(),
            timeout_seconds: 5,
        },
        fetcher: FetcherConfig {
            interval_seconds: 3600,
            max_posts_per_fetch: 10,
            date_range_days: 365,
            autostart: false,
        },
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
            algorithm: "HS256".to_string(),
            expiry_minutes: 60,
        },
    }
}

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub source: Arc<ScriptedSource>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(ScriptedSource::new());
        let state = AppState::new(config, store.clone(), source.clone())
            .expect("test state should build");

        Self { state, store, source }
    }

    pub fn router(&self) -> Router {
        app(self.state.clone())
    }

    pub fn token_for(&self, user_id: i64) -> String {
        self.state.auth.issue(user_id).unwrap().access_token
    }

    pub async fn request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn stored_posts(&self) -> usize {
        self.store.list_all().await.unwrap().0.len()
    }
}

pub fn json_request(method: &str, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}
