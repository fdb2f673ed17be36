//! Debounced trigger for asynchronous score recomputation.
//!
//! A short-lived lease per entity admits at most one enqueue per lease
//! window. Leases are never released; they expire.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::jobs::enqueue_job;
use crate::application::repos::{JobSubmission, JobsRepo, RepoError};
use crate::cache::{CacheKey, KvCache};
use crate::domain::types::ScoringEntity;

pub const DEFAULT_DEBOUNCE_TTL: Duration = Duration::from_secs(300);

pub const METRIC_SCORING_ENQUEUED: &str = "quire_scoring_enqueued_total";
pub const METRIC_SCORING_DEBOUNCED: &str = "quire_scoring_debounced_total";

const LEASE_VALUE: &str = "1";
const TARGET: &str = "quire::application::scoring";

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoringTargets {
    pub article_id: Option<i64>,
    pub user_id: Option<i64>,
}

impl ScoringTargets {
    pub fn article(article_id: i64) -> Self {
        Self {
            article_id: Some(article_id),
            user_id: None,
        }
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoringOutcome {
    /// Lease acquired and the job was queued.
    Enqueued { job_id: String },
    /// Lease acquired but the queue already held a pending job with this id.
    AlreadyQueued { job_id: String },
    /// A lease is live; nothing was queued.
    Debounced,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoringReport {
    pub article: Option<ScoringOutcome>,
    pub user: Option<ScoringOutcome>,
}

#[derive(Debug, Serialize)]
struct RecalcArticlePayload {
    article_id: i64,
}

#[derive(Debug, Serialize)]
struct RecalcUserPayload {
    user_id: i64,
}

pub fn job_id_for(entity: ScoringEntity, id: i64) -> String {
    format!("recalc-{}:{id}", entity.as_str())
}

pub struct ScoringDebouncer {
    cache: Arc<dyn KvCache>,
    jobs: Arc<dyn JobsRepo>,
    lease_ttl: Duration,
}

impl ScoringDebouncer {
    pub fn new(cache: Arc<dyn KvCache>, jobs: Arc<dyn JobsRepo>, lease_ttl: Duration) -> Self {
        Self {
            cache,
            jobs,
            lease_ttl,
        }
    }

    /// Never enqueues platform-wide tier re-bucketing; that runs on its own
    /// schedule elsewhere.
    pub async fn enqueue_scoring_jobs(
        &self,
        targets: ScoringTargets,
    ) -> Result<ScoringReport, ScoringError> {
        let mut report = ScoringReport::default();
        if let Some(article_id) = targets.article_id {
            report.article = Some(self.debounce(ScoringEntity::Article, article_id).await?);
        }
        if let Some(user_id) = targets.user_id {
            report.user = Some(self.debounce(ScoringEntity::User, user_id).await?);
        }
        Ok(report)
    }

    async fn debounce(&self, entity: ScoringEntity, id: i64) -> Result<ScoringOutcome, RepoError> {
        let key = CacheKey::ScoringDebounce(entity, id).render();
        let acquired = match self.cache.set_nx_ex(&key, LEASE_VALUE, self.lease_ttl).await {
            Ok(acquired) => acquired,
            Err(err) => {
                // Queue-level id dedupe still bounds duplicates.
                warn!(
                    target = TARGET,
                    entity = entity.as_str(),
                    id,
                    error = %err,
                    "debounce lease unavailable; enqueueing without it"
                );
                true
            }
        };

        if !acquired {
            counter!(METRIC_SCORING_DEBOUNCED, "entity" => entity.as_str()).increment(1);
            debug!(
                target = TARGET,
                entity = entity.as_str(),
                id,
                "recompute already scheduled"
            );
            return Ok(ScoringOutcome::Debounced);
        }

        let job_id = job_id_for(entity, id);
        let submission = match entity {
            ScoringEntity::Article => {
                enqueue_job(
                    self.jobs.as_ref(),
                    job_id,
                    entity.job_type(),
                    &RecalcArticlePayload { article_id: id },
                )
                .await?
            }
            ScoringEntity::User => {
                enqueue_job(
                    self.jobs.as_ref(),
                    job_id,
                    entity.job_type(),
                    &RecalcUserPayload { user_id: id },
                )
                .await?
            }
        };

        Ok(match submission {
            JobSubmission::Accepted(job_id) => {
                counter!(METRIC_SCORING_ENQUEUED, "entity" => entity.as_str()).increment(1);
                debug!(target = TARGET, job_id = %job_id, "scoring job enqueued");
                ScoringOutcome::Enqueued { job_id }
            }
            JobSubmission::Duplicate(job_id) => ScoringOutcome::AlreadyQueued { job_id },
        })
    }
}
