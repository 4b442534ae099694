use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored post. `post_id` is the source API identifier and is unique in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub post_id: i64,
    pub user_id: i64,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Stored comment. `post_id` is a loose reference; nothing enforces that the post exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub comment_id: i64,
    pub post_id: i64,
    pub name: String,
    pub email: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Fields changed by the update endpoint. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
}

impl PostUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none()
    }
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub post_id: i64,
    pub user_id: i64,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub comment_count: u64,
}

impl PostResponse {
    pub fn new(post: Post, comment_count: u64) -> Self {
        Self {
            post_id: post.post_id,
            user_id: post.user_id,
            title: post.title,
            body: post.body,
            created_at: post.created_at,
            updated_at: post.updated_at,
            comment_count,
        }
    }
}

/// Full contents of the store.
#[derive(Debug, Serialize)]
pub struct StoreDump {
    pub total_posts: usize,
    pub total_comments: usize,
    pub posts: Vec<Post>,
    pub comments: Vec<Comment>,
}

impl StoreDump {
    pub fn new(posts: Vec<Post>, comments: Vec<Comment>) -> Self {
        Self {
            total_posts: posts.len(),
            total_comments: comments.len(),
            posts,
            comments,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClearSummary {
    pub deleted_posts: u64,
    pub deleted_comments: u64,
}

impl ClearSummary {
    pub fn total(&self) -> u64 {
        self.deleted_posts + self.deleted_comments
    }
}
