//! Deterministic keyset index over feed-visible articles.

use std::sync::Arc;

use tracing::debug;

use crate::application::pagination::{CursorPage, FeedCursor, PageRequest};
use crate::application::repos::{FeedIndexRepo, RepoError};
use crate::domain::entities::{FeedIndexEntry, FeedIndexRow};
use crate::domain::principal::Principal;

pub const DEFAULT_FEED_LIMIT: u32 = 20;
pub const MAX_FEED_LIMIT: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for FeedLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_FEED_LIMIT,
            max_limit: MAX_FEED_LIMIT,
        }
    }
}

impl FeedLimits {
    /// Missing limits use the default; everything is clamped to `1..=max`.
    pub fn clamp(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }
}

impl From<&crate::config::FeedSettings> for FeedLimits {
    fn from(settings: &crate::config::FeedSettings) -> Self {
        Self {
            default_limit: settings.default_limit.get(),
            max_limit: settings.max_limit.get(),
        }
    }
}

pub struct FeedIndexService {
    repo: Arc<dyn FeedIndexRepo>,
    limits: FeedLimits,
}

impl FeedIndexService {
    pub fn new(repo: Arc<dyn FeedIndexRepo>, limits: FeedLimits) -> Self {
        Self { repo, limits }
    }

    pub fn limits(&self) -> FeedLimits {
        self.limits
    }

    /// Fetches one page of ids in `(ranking_score, created_at, id)` descending
    /// order. `next_cursor` is only set when further rows exist.
    pub async fn feed_index(
        &self,
        viewer: Principal,
        request: PageRequest<FeedCursor>,
    ) -> Result<CursorPage<FeedIndexEntry>, RepoError> {
        let limit = self.limits.clamp(Some(request.limit));
        let mut rows = self.repo.list_feed_window(request.cursor, limit + 1).await?;

        let has_more = rows.len() > limit as usize;
        rows.truncate(limit as usize);

        let next_cursor = if has_more {
            rows.last().map(cursor_for).map(|cursor| cursor.encode())
        } else {
            None
        };

        debug!(
            target = "quire::application::feed_index",
            viewer = %viewer,
            limit,
            returned = rows.len(),
            has_more,
            "feed index page"
        );

        Ok(CursorPage::new(
            rows.into_iter().map(FeedIndexEntry::from).collect(),
            next_cursor,
        ))
    }
}

fn cursor_for(row: &FeedIndexRow) -> FeedCursor {
    FeedCursor::new(row.id, row.created_at, row.ranking_score)
}

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use std::sync::Mutex;

    use super::*;

    /// In-memory index applying the same visibility-free keyset semantics
    /// as the Postgres adapter.
    #[derive(Default)]
    pub struct StaticIndex {
        pub rows: Vec<FeedIndexRow>,
        pub calls: Mutex<Vec<(Option<FeedCursor>, u32)>>,
    }

    impl StaticIndex {
        pub fn new(mut rows: Vec<FeedIndexRow>) -> Self {
            rows.sort_by(|a, b| {
                b.ranking_score
                    .total_cmp(&a.ranking_score)
                    .then(b.created_at.cmp(&a.created_at))
                    .then(b.id.cmp(&a.id))
            });
            Self {
                rows,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    fn after(row: &FeedIndexRow, cursor: &FeedCursor) -> bool {
        row.ranking_score < cursor.ranking_score()
            || (row.ranking_score == cursor.ranking_score()
                && row.created_at < cursor.created_at())
            || (row.ranking_score == cursor.ranking_score()
                && row.created_at == cursor.created_at()
                && row.id < cursor.id())
    }

    #[async_trait]
    impl FeedIndexRepo for StaticIndex {
        async fn list_feed_window(
            &self,
            after_cursor: Option<FeedCursor>,
            limit: u32,
        ) -> Result<Vec<FeedIndexRow>, RepoError> {
            self.calls
                .lock()
                .expect("calls lock")
                .push((after_cursor, limit));
            Ok(self
                .rows
                .iter()
                .filter(|row| after_cursor.as_ref().is_none_or(|c| after(row, c)))
                .take(limit as usize)
                .copied()
                .collect())
        }
    }
}
