//! Repository traits describing persistence adapters.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::application::pagination::FeedCursor;
use crate::domain::entities::{
    ArticleRef, ArticleSource, FeedIndexRow, ReputationRecord, StatsSnapshot,
};
use crate::domain::types::{InteractionKind, JobType};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[async_trait]
pub trait FeedIndexRepo: Send + Sync {
    /// Returns up to `limit` feed-visible rows strictly after `after` in
    /// `(ranking_score DESC, created_at DESC, id DESC)` order.
    async fn list_feed_window(
        &self,
        after: Option<FeedCursor>,
        limit: u32,
    ) -> Result<Vec<FeedIndexRow>, RepoError>;
}

#[async_trait]
pub trait ArticlesRepo: Send + Sync {
    /// Batch lookup; unknown ids are omitted.
    async fn load_sources(&self, ids: &[i64]) -> Result<Vec<ArticleSource>, RepoError>;

    /// Batch counter read; unknown ids are omitted.
    async fn load_stats(&self, ids: &[i64]) -> Result<Vec<(i64, StatsSnapshot)>, RepoError>;

    async fn find_ref(&self, id: i64) -> Result<Option<ArticleRef>, RepoError>;
}

#[derive(Debug, Clone, Copy)]
pub struct RecordInteractionParams {
    pub user_id: i64,
    pub article_id: i64,
    pub kind: InteractionKind,
    /// Repeated views inside this window are not counted.
    pub view_window: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionWrite {
    Counted,
    /// Repeated upvote or a view inside the window; counters unchanged.
    Suppressed,
}

#[async_trait]
pub trait EngagementWriteRepo: Send + Sync {
    /// Inserts the interaction and bumps its counter in one transaction.
    async fn record_interaction(
        &self,
        params: RecordInteractionParams,
    ) -> Result<InteractionWrite, RepoError>;
}

#[async_trait]
pub trait ReputationRepo: Send + Sync {
    /// Users with role `user`, reputation descending, id ascending.
    async fn list_top_users(&self, limit: u32) -> Result<Vec<ReputationRecord>, RepoError>;

    async fn find_user(&self, user_id: i64) -> Result<Option<ReputationRecord>, RepoError>;

    /// Users with role `user` and strictly greater reputation.
    async fn count_users_above(&self, reputation: i64) -> Result<u64, RepoError>;
}

#[derive(Debug, Clone)]
pub struct NewJobRecord {
    /// Deterministic id used for queue-level dedupe.
    pub id: String,
    pub job_type: JobType,
    pub payload: Value,
    pub max_attempts: i32,
    pub priority: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSubmission {
    Accepted(String),
    /// A job with the same id is still pending or running.
    Duplicate(String),
}

#[async_trait]
pub trait JobsRepo: Send + Sync {
    async fn submit_job(&self, job: NewJobRecord) -> Result<JobSubmission, RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
