use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Bson, DateTime as BsonDateTime, Document},
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{
        ClientOptions, FindOneAndUpdateOptions, FindOptions, IndexOptions, InsertManyOptions,
        ReturnDocument,
    },
    Client, Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use super::PostStore;
use crate::error::Result;
use crate::models::{ClearSummary, Comment, DateRange, Post, PostUpdate};

const POSTS: &str = "posts";
const COMMENTS: &str = "comments";
const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Serialize, Deserialize)]
struct PostDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    post_id: i64,
    user_id: i64,
    title: String,
    body: String,
    created_at: BsonDateTime,
    fetched_at: BsonDateTime,
    #[serde(default)]
    updated_at: Option<BsonDateTime>,
}

impl From<&Post> for PostDocument {
    fn from(post: &Post) -> Self {
        Self {
            id: None,
            post_id: post.post_id,
            user_id: post.user_id,
            title: post.title.clone(),
            body: post.body.clone(),
            created_at: BsonDateTime::from_chrono(post.created_at),
            fetched_at: BsonDateTime::from_chrono(post.fetched_at),
            updated_at: post.updated_at.map(BsonDateTime::from_chrono),
        }
    }
}

impl From<PostDocument> for Post {
    fn from(doc: PostDocument) -> Self {
        Self {
            post_id: doc.post_id,
            user_id: doc.user_id,
            title: doc.title,
            body: doc.body,
            created_at: doc.created_at.to_chrono(),
            fetched_at: doc.fetched_at.to_chrono(),
            updated_at: doc.updated_at.map(|dt| dt.to_chrono()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CommentDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    comment_id: i64,
    post_id: i64,
    name: String,
    email: String,
    body: String,
    created_at: BsonDateTime,
}

impl From<&Comment> for CommentDocument {
    fn from(comment: &Comment) -> Self {
        Self {
            id: None,
            comment_id: comment.comment_id,
            post_id: comment.post_id,
            name: comment.name.clone(),
            email: comment.email.clone(),
            body: comment.body.clone(),
            created_at: BsonDateTime::from_chrono(comment.created_at),
        }
    }
}

impl From<CommentDocument> for Comment {
    fn from(doc: CommentDocument) -> Self {
        Self {
            comment_id: doc.comment_id,
            post_id: doc.post_id,
            name: doc.name,
            email: doc.email,
            body: doc.body,
            created_at: doc.created_at.to_chrono(),
        }
    }
}

/// MongoDB-backed store. The driver pools connections, so clones share one pool.
#[derive(Clone)]
pub struct MongoStore {
    posts: Collection<PostDocument>,
    comments: Collection<CommentDocument>,
}

impl MongoStore {
    pub async fn connect(url: &str, database: &str) -> anyhow::Result<Self> {
        let mut options = ClientOptions::parse(url).await?;
        options.server_selection_timeout = Some(Duration::from_secs(5));
        options.connect_timeout = Some(Duration::from_secs(5));
        options.app_name = Some("posts-ingest-service".to_string());

        let client = Client::with_options(options)?;
        let db = client.database(database);

        db.run_command(doc! { "ping": 1 }, None).await?;
        tracing::info!(database = %database, "MongoDB connection established");

        let store = Self::from_database(&db);
        store.create_indexes().await?;

        Ok(store)
    }

    fn from_database(db: &Database) -> Self {
        Self {
            posts: db.collection(POSTS),
            comments: db.collection(COMMENTS),
        }
    }

    async fn create_indexes(&self) -> anyhow::Result<()> {
        let unique = || IndexOptions::builder().unique(true).build();

        self.posts
            .create_index(
                IndexModel::builder().keys(doc! { "post_id": 1 }).options(unique()).build(),
                None,
            )
            .await?;
        self.posts
            .create_index(IndexModel::builder().keys(doc! { "created_at": 1 }).build(), None)
            .await?;
        self.comments
            .create_index(
                IndexModel::builder().keys(doc! { "comment_id": 1 }).options(unique()).build(),
                None,
            )
            .await?;
        self.comments
            .create_index(IndexModel::builder().keys(doc! { "post_id": 1 }).build(), None)
            .await?;

        tracing::info!("Database indexes created");
        Ok(())
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == DUPLICATE_KEY,
        _ => false,
    }
}

/// Number of rejected documents when every rejection was a duplicate key,
/// `None` if anything else went wrong.
fn duplicate_only_failures(err: &MongoError) -> Option<usize> {
    match err.kind.as_ref() {
        ErrorKind::BulkWrite(failure) => {
            if failure.write_concern_error.is_some() {
                return None;
            }
            let errors = failure.write_errors.as_deref().unwrap_or_default();
            errors
                .iter()
                .all(|e| e.code == DUPLICATE_KEY)
                .then_some(errors.len())
        }
        _ => None,
    }
}

fn as_post_id(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int64(id) => Some(*id),
        Bson::Int32(id) => Some(i64::from(*id)),
        _ => None,
    }
}

fn date_filter(range: DateRange) -> Document {
    let mut bounds = Document::new();
    if let Some(from) = range.from {
        bounds.insert("$gte", BsonDateTime::from_chrono(from));
    }
    if let Some(to) = range.to {
        bounds.insert("$lte", BsonDateTime::from_chrono(to));
    }

    if bounds.is_empty() {
        Document::new()
    } else {
        doc! { "created_at": bounds }
    }
}

fn by_comment_id(limit: Option<i64>) -> FindOptions {
    FindOptions::builder()
        .sort(doc! { "comment_id": 1 })
        .limit(limit)
        .build()
}

#[async_trait]
impl PostStore for MongoStore {
    async fn insert_post(&self, post: &Post) -> Result<bool> {
        match self.posts.insert_one(PostDocument::from(post), None).await {
            Ok(_) => Ok(true),
            Err(e) if is_duplicate_key(&e) => {
                tracing::debug!(post_id = post.post_id, "Post already stored, skipping insert");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn insert_comments(&self, comments: &[Comment]) -> Result<u64> {
        if comments.is_empty() {
            return Ok(0);
        }

        let docs: Vec<CommentDocument> = comments.iter().map(CommentDocument::from).collect();
        let options = InsertManyOptions::builder().ordered(false).build();

        match self.comments.insert_many(docs, options).await {
            Ok(result) => Ok(result.inserted_ids.len() as u64),
            Err(e) => match duplicate_only_failures(&e) {
                Some(skipped) => Ok(comments.len().saturating_sub(skipped) as u64),
                None => Err(e.into()),
            },
        }
    }

    async fn post_exists(&self, post_id: i64) -> Result<bool> {
        let count = self
            .posts
            .count_documents(doc! { "post_id": post_id }, None)
            .await?;
        Ok(count > 0)
    }

    async fn existing_post_ids(&self, post_ids: &[i64]) -> Result<HashSet<i64>> {
        if post_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let values = self
            .posts
            .distinct("post_id", doc! { "post_id": { "$in": post_ids.to_vec() } }, None)
            .await?;
        Ok(values.iter().filter_map(as_post_id).collect())
    }

    async fn find_post(&self, post_id: i64) -> Result<Option<Post>> {
        let doc = self.posts.find_one(doc! { "post_id": post_id }, None).await?;
        Ok(doc.map(Post::from))
    }

    async fn find_comments_by_post(&self, post_id: i64) -> Result<Vec<Comment>> {
        let cursor = self
            .comments
            .find(doc! { "post_id": post_id }, by_comment_id(None))
            .await?;
        let docs: Vec<CommentDocument> = cursor.try_collect().await?;
        Ok(docs.into_iter().map(Comment::from).collect())
    }

    async fn count_comments_by_post(&self, post_id: i64) -> Result<u64> {
        Ok(self
            .comments
            .count_documents(doc! { "post_id": post_id }, None)
            .await?)
    }

    async fn find_comment(&self, comment_id: i64) -> Result<Option<Comment>> {
        let doc = self
            .comments
            .find_one(doc! { "comment_id": comment_id }, None)
            .await?;
        Ok(doc.map(Comment::from))
    }

    async fn search_comments(&self, text: &str, limit: usize) -> Result<Vec<Comment>> {
        let filter = doc! {
            "body": { "$regex": regex::escape(text), "$options": "i" }
        };
        let cursor = self
            .comments
            .find(filter, by_comment_id(Some(limit as i64)))
            .await?;
        let docs: Vec<CommentDocument> = cursor.try_collect().await?;
        Ok(docs.into_iter().map(Comment::from).collect())
    }

    async fn count_posts(&self, range: DateRange) -> Result<u64> {
        Ok(self.posts.count_documents(date_filter(range), None).await?)
    }

    async fn update_post(&self, post_id: i64, update: PostUpdate) -> Result<Option<Post>> {
        let mut set = doc! { "updated_at": BsonDateTime::from_chrono(Utc::now()) };
        if let Some(title) = update.title {
            set.insert("title", title);
        }
        if let Some(body) = update.body {
            set.insert("body", body);
        }

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let doc = self
            .posts
            .find_one_and_update(doc! { "post_id": post_id }, doc! { "$set": set }, options)
            .await?;
        Ok(doc.map(Post::from))
    }

    async fn list_all(&self) -> Result<(Vec<Post>, Vec<Comment>)> {
        let posts_options = FindOptions::builder().sort(doc! { "post_id": 1 }).build();
        let posts: Vec<PostDocument> = self
            .posts
            .find(Document::new(), posts_options)
            .await?
            .try_collect()
            .await?;
        let comments: Vec<CommentDocument> = self
            .comments
            .find(Document::new(), by_comment_id(None))
            .await?
            .try_collect()
            .await?;

        Ok((
            posts.into_iter().map(Post::from).collect(),
            comments.into_iter().map(Comment::from).collect(),
        ))
    }

    async fn delete_all(&self) -> Result<ClearSummary> {
        let posts = self.posts.delete_many(Document::new(), None).await?;
        let comments = self.comments.delete_many(Document::new(), None).await?;

        Ok(ClearSummary {
            deleted_posts: posts.deleted_count,
            deleted_comments: comments.deleted_count,
        })
    }
}
