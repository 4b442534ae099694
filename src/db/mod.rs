mod memory;
mod mongo;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Config, StoreBackend};
use crate::error::Result;
use crate::models::{ClearSummary, Comment, DateRange, Post, PostUpdate};

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Posts and comments persistence. Every method maps to a single store call.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Insert unless a post with the same `post_id` exists. Returns `false` when
    /// the post was already present, including a lost race on the unique index.
    async fn insert_post(&self, post: &Post) -> Result<bool>;

    /// Insert comments, skipping ids that are already stored. Returns the number inserted.
    async fn insert_comments(&self, comments: &[Comment]) -> Result<u64>;

    async fn post_exists(&self, post_id: i64) -> Result<bool>;

    /// Which of `post_ids` are already stored, in a single lookup.
    async fn existing_post_ids(&self, post_ids: &[i64]) -> Result<HashSet<i64>>;

    async fn find_post(&self, post_id: i64) -> Result<Option<Post>>;

    async fn find_comments_by_post(&self, post_id: i64) -> Result<Vec<Comment>>;

    async fn count_comments_by_post(&self, post_id: i64) -> Result<u64>;

    async fn find_comment(&self, comment_id: i64) -> Result<Option<Comment>>;

    /// Case-insensitive literal substring match on the comment body.
    async fn search_comments(&self, text: &str, limit: usize) -> Result<Vec<Comment>>;

    async fn count_posts(&self, range: DateRange) -> Result<u64>;

    /// Apply the supplied fields and stamp `updated_at`. `None` when the post is missing.
    async fn update_post(&self, post_id: i64, update: PostUpdate) -> Result<Option<Post>>;

    async fn list_all(&self) -> Result<(Vec<Post>, Vec<Comment>)>;

    async fn delete_all(&self) -> Result<ClearSummary>;
}

pub async fn connect(config: &Config) -> anyhow::Result<Arc<dyn PostStore>> {
    match config.database.backend {
        StoreBackend::Mongo => {
            let store = MongoStore::connect(&config.database.url, &config.database.name).await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
