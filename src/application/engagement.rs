//! Synchronous engagement write path.
//!
//! Records an interaction, bumps the matching counter, then asks the scoring
//! debouncer for a recompute of the article and its author. Ranking scores
//! are never touched here.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::application::repos::{
    ArticlesRepo, EngagementWriteRepo, InteractionWrite, RecordInteractionParams, RepoError,
};
use crate::application::scoring::{ScoringDebouncer, ScoringTargets};
use crate::domain::principal::Principal;
use crate::domain::types::InteractionKind;

pub const DEFAULT_VIEW_WINDOW: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Error)]
pub enum EngagementError {
    #[error("article `{0}` not found")]
    ArticleNotFound(i64),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InteractionReceipt {
    pub kind: InteractionKind,
    pub recorded: bool,
}

pub struct EngagementService {
    articles: Arc<dyn ArticlesRepo>,
    writes: Arc<dyn EngagementWriteRepo>,
    scoring: Arc<ScoringDebouncer>,
    view_window: Duration,
}

impl EngagementService {
    pub fn new(
        articles: Arc<dyn ArticlesRepo>,
        writes: Arc<dyn EngagementWriteRepo>,
        scoring: Arc<ScoringDebouncer>,
        view_window: Duration,
    ) -> Self {
        Self {
            articles,
            writes,
            scoring,
            view_window,
        }
    }

    pub async fn record_interaction(
        &self,
        principal: Principal,
        article_id: i64,
        kind: InteractionKind,
    ) -> Result<InteractionReceipt, EngagementError> {
        let article = self
            .articles
            .find_ref(article_id)
            .await?
            .ok_or(EngagementError::ArticleNotFound(article_id))?;

        let outcome = self
            .writes
            .record_interaction(RecordInteractionParams {
                user_id: principal.user_id(),
                article_id,
                kind,
                view_window: self.view_window,
            })
            .await?;

        // Throttled views are silent; repeated upvotes still nudge scoring.
        let rescore = !(kind == InteractionKind::View && outcome == InteractionWrite::Suppressed);
        if rescore {
            let targets = ScoringTargets::article(article.id).with_user(article.author_id);
            if let Err(err) = self.scoring.enqueue_scoring_jobs(targets).await {
                warn!(
                    target = "quire::application::engagement",
                    article_id,
                    kind = kind.as_str(),
                    error = %err,
                    "failed to schedule score recomputation"
                );
            }
        }

        Ok(InteractionReceipt {
            kind,
            recorded: outcome == InteractionWrite::Counted,
        })
    }
}
