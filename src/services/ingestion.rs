//! Fetch-and-deduplicate ingestion tick
//!
//! One tick: list posts from the source, drop the ones already stored, and for
//! at most `max_posts_per_fetch` new posts fetch their comments, synthesize
//! timestamps and write post then comments. A failing post is logged and
//! skipped; nothing is rolled back.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::source_client::{PostSource, SourceComment, SourcePost};
use crate::config::FetcherConfig;
use crate::db::PostStore;
use crate::error::{AppError, Result};
use crate::models::{Comment, Post};
use crate::utils::{random_comment_date, random_post_date};

/// Outcome of one ingestion tick, exposed through the fetcher status.
#[derive(Debug, Clone, Serialize)]
pub struct TickSummary {
    pub tick_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub total_fetched: usize,
    pub new_posts: usize,
    pub new_comments: u64,
    pub skipped_posts: usize,
    pub failed_posts: usize,
    pub cancelled: bool,
    pub error: Option<String>,
}

impl TickSummary {
    fn begin(tick_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            tick_id,
            started_at,
            finished_at: started_at,
            elapsed_ms: 0,
            total_fetched: 0,
            new_posts: 0,
            new_comments: 0,
            skipped_posts: 0,
            failed_posts: 0,
            cancelled: false,
            error: None,
        }
    }

    fn finish(mut self, timer: Instant) -> Self {
        self.finished_at = Utc::now();
        self.elapsed_ms = timer.elapsed().as_millis() as u64;
        self
    }
}

pub struct Ingestor {
    source: Arc<dyn PostSource>,
    store: Arc<dyn PostStore>,
    max_posts_per_fetch: usize,
    date_range_days: i64,
}

impl Ingestor {
    pub fn new(source: Arc<dyn PostSource>, store: Arc<dyn PostStore>, config: &FetcherConfig) -> Self {
        Self {
            source,
            store,
            max_posts_per_fetch: config.max_posts_per_fetch,
            date_range_days: config.date_range_days,
        }
    }

    /// Run one tick. Errors listing posts fail the whole tick and are recorded
    /// in the summary; per-post errors are counted in `failed_posts`.
    /// `stop` is checked between posts, never in the middle of a write.
    pub async fn tick(&self, stop: &watch::Receiver<bool>) -> TickSummary {
        let tick_id = Uuid::new_v4();
        let timer = Instant::now();
        let mut summary = TickSummary::begin(tick_id, Utc::now());

        info!(tick_id = %tick_id, "Starting ingestion tick");

        if let Err(e) = self.run(tick_id, stop, &mut summary).await {
            error!(tick_id = %tick_id, error = %e, "Ingestion tick failed");
            summary.error = Some(e.to_string());
        }

        let summary = summary.finish(timer);
        info!(
            tick_id = %tick_id,
            total_fetched = summary.total_fetched,
            new_posts = summary.new_posts,
            new_comments = summary.new_comments,
            skipped_posts = summary.skipped_posts,
            failed_posts = summary.failed_posts,
            cancelled = summary.cancelled,
            elapsed_ms = summary.elapsed_ms,
            "Ingestion tick completed"
        );
        summary
    }

    async fn run(&self, tick_id: Uuid, stop: &watch::Receiver<bool>, summary: &mut TickSummary) -> Result<()> {
        let posts = self.source.list_posts().await?;
        summary.total_fetched = posts.len();

        let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
        let existing = self.store.existing_post_ids(&ids).await?;

        let new_posts: Vec<SourcePost> = posts
            .into_iter()
            .filter(|p| !existing.contains(&p.id))
            .collect();
        summary.skipped_posts = summary.total_fetched - new_posts.len();

        let pending: Vec<SourcePost> = new_posts.into_iter().take(self.max_posts_per_fetch).collect();
        info!(tick_id = %tick_id, new = pending.len(), "Processing new posts");

        for post in pending {
            if *stop.borrow() {
                warn!(tick_id = %tick_id, "Stop requested, abandoning rest of tick");
                summary.cancelled = true;
                break;
            }

            let post_id = post.id;
            match self.ingest_post(post).await {
                Ok(Some(comments)) => {
                    summary.new_posts += 1;
                    summary.new_comments += comments;
                }
                Ok(None) => summary.skipped_posts += 1,
                Err(e) => {
                    error!(tick_id = %tick_id, post_id, error = %e, "Failed to process post");
                    summary.failed_posts += 1;
                }
            }
        }

        Ok(())
    }

    /// Store one post and its comments. `None` when another writer stored the
    /// post first.
    ///
    /// The two writes run in their own task: if the tick is aborted while
    /// waiting, the post still gets its comments.
    async fn ingest_post(&self, post: SourcePost) -> Result<Option<u64>> {
        let comments = self.source.list_comments(post.id).await?;
        let (post, comments) = self.synthesize(post, comments);

        tokio::spawn(write_post(self.store.clone(), post, comments))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Post write task failed: {}", e)))?
    }

    fn synthesize(&self, post: SourcePost, comments: Vec<SourceComment>) -> (Post, Vec<Comment>) {
        let mut rng = rand::thread_rng();
        let now = Utc::now().trunc_subsecs(3);
        let created_at = random_post_date(&mut rng, now, self.date_range_days);

        let comments = comments
            .into_iter()
            .map(|c| Comment {
                comment_id: c.id,
                post_id: c.post_id,
                name: c.name,
                email: c.email,
                body: c.body,
                created_at: random_comment_date(&mut rng, now, created_at),
            })
            .collect();

        let post = Post {
            post_id: post.id,
            user_id: post.user_id,
            title: post.title,
            body: post.body,
            created_at,
            fetched_at: now,
            updated_at: None,
        };

        (post, comments)
    }
}

async fn write_post(store: Arc<dyn PostStore>, post: Post, comments: Vec<Comment>) -> Result<Option<u64>> {
    if !store.insert_post(&post).await? {
        return Ok(None);
    }
    let inserted = store.insert_comments(&comments).await?;
    Ok(Some(inserted))
}
