//! Client for the read-only posts/comments source API
//!
//! The source is JSONPlaceholder-shaped: `GET /posts` and
//! `GET /posts/{id}/comments`, camelCase JSON.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use tracing::info;

use crate::config::SourceConfig;
use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcePost {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceComment {
    pub id: i64,
    pub post_id: i64,
    pub name: String,
    pub email: String,
    pub body: String,
}

#[async_trait]
pub trait PostSource: Send + Sync {
    async fn list_posts(&self) -> Result<Vec<SourcePost>>;

    async fn list_comments(&self, post_id: i64) -> Result<Vec<SourceComment>>;
}

/// reqwest-backed [`PostSource`]
pub struct HttpPostSource {
    client: Client,
    base_url: String,
}

impl HttpPostSource {
    pub fn new(config: &SourceConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!("{} returned {}", url, status)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::Upstream(format!("Parse of {} failed: {}", url, e)))
    }
}

#[async_trait]
impl PostSource for HttpPostSource {
    async fn list_posts(&self) -> Result<Vec<SourcePost>> {
        let posts: Vec<SourcePost> = self.get_json("/posts").await?;
        info!(count = posts.len(), "Fetched posts from source API");
        Ok(posts)
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<SourceComment>> {
        self.get_json(&format!("/posts/{}/comments", post_id)).await
    }
}
