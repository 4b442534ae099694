use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::PostStore;
use crate::error::Result;
use crate::models::{ClearSummary, Comment, DateRange, Post, PostUpdate};

#[derive(Default)]
struct Collections {
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
}

/// In-process store with the same semantics as [`super::MongoStore`].
/// Keys are the external ids, which gives the uniqueness the Mongo indexes provide.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn insert_post(&self, post: &Post) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if inner.posts.contains_key(&post.post_id) {
            return Ok(false);
        }
        inner.posts.insert(post.post_id, post.clone());
        Ok(true)
    }

    async fn insert_comments(&self, comments: &[Comment]) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let mut inserted = 0;
        for comment in comments {
            if !inner.comments.contains_key(&comment.comment_id) {
                inner.comments.insert(comment.comment_id, comment.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn post_exists(&self, post_id: i64) -> Result<bool> {
        Ok(self.inner.read().await.posts.contains_key(&post_id))
    }

    async fn existing_post_ids(&self, post_ids: &[i64]) -> Result<HashSet<i64>> {
        let inner = self.inner.read().await;
        Ok(post_ids
            .iter()
            .copied()
            .filter(|id| inner.posts.contains_key(id))
            .collect())
    }

    async fn find_post(&self, post_id: i64) -> Result<Option<Post>> {
        Ok(self.inner.read().await.posts.get(&post_id).cloned())
    }

    async fn find_comments_by_post(&self, post_id: i64) -> Result<Vec<Comment>> {
        let inner = self.inner.read().await;
        Ok(inner
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn count_comments_by_post(&self, post_id: i64) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner.comments.values().filter(|c| c.post_id == post_id).count() as u64)
    }

    async fn find_comment(&self, comment_id: i64) -> Result<Option<Comment>> {
        Ok(self.inner.read().await.comments.get(&comment_id).cloned())
    }

    async fn search_comments(&self, text: &str, limit: usize) -> Result<Vec<Comment>> {
        let needle = text.to_lowercase();
        let inner = self.inner.read().await;
        Ok(inner
            .comments
            .values()
            .filter(|c| c.body.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_posts(&self, range: DateRange) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner
            .posts
            .values()
            .filter(|p| range.contains(&p.created_at))
            .count() as u64)
    }

    async fn update_post(&self, post_id: i64, update: PostUpdate) -> Result<Option<Post>> {
        let mut inner = self.inner.write().await;
        let Some(post) = inner.posts.get_mut(&post_id) else {
            return Ok(None);
        };

        if let Some(title) = update.title {
            post.title = title;
        }
        if let Some(body) = update.body {
            post.body = body;
        }
        post.updated_at = Some(Utc::now());

        Ok(Some(post.clone()))
    }

    async fn list_all(&self) -> Result<(Vec<Post>, Vec<Comment>)> {
        let inner = self.inner.read().await;
        Ok((
            inner.posts.values().cloned().collect(),
            inner.comments.values().cloned().collect(),
        ))
    }

    async fn delete_all(&self) -> Result<ClearSummary> {
        let mut inner = self.inner.write().await;
        let summary = ClearSummary {
            deleted_posts: inner.posts.len() as u64,
            deleted_comments: inner.comments.len() as u64,
        };
        inner.posts.clear();
        inner.comments.clear();
        Ok(summary)
    }
}
