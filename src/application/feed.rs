//! Feed assembly: index page, then projections and stats side by side.

use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::application::feed_index::FeedIndexService;
use crate::application::pagination::{CursorPage, FeedCursor, PageRequest};
use crate::application::projections::ProjectionService;
use crate::application::repos::RepoError;
use crate::application::stats::StatsService;
use crate::domain::entities::StatsSnapshot;
use crate::domain::principal::Principal;
use crate::domain::projection::Projection;

pub const FALLBACK_FIELD_LABEL: &str = "General";

pub const METRIC_FEED_ASSEMBLE_MS: &str = "quire_feed_assemble_ms";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// A feed card: projection and counters side by side plus a display label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedItem {
    #[serde(flatten)]
    pub projection: Projection,
    #[serde(flatten)]
    pub stats: StatsSnapshot,
    pub field: String,
}

impl FeedItem {
    pub fn assemble(projection: Projection, stats: StatsSnapshot) -> Self {
        let field = field_label(&projection);
        Self {
            projection,
            stats,
            field,
        }
    }
}

/// First tag, else category name, else the fallback label.
pub fn field_label(projection: &Projection) -> String {
    projection
        .tags
        .first()
        .cloned()
        .or_else(|| projection.category.as_ref().map(|c| c.name.clone()))
        .unwrap_or_else(|| FALLBACK_FIELD_LABEL.to_string())
}

pub struct FeedService {
    index: Arc<FeedIndexService>,
    projections: Arc<ProjectionService>,
    stats: Arc<StatsService>,
}

impl FeedService {
    pub fn new(
        index: Arc<FeedIndexService>,
        projections: Arc<ProjectionService>,
        stats: Arc<StatsService>,
    ) -> Self {
        Self {
            index,
            projections,
            stats,
        }
    }

    pub fn index(&self) -> &FeedIndexService {
        &self.index
    }

    pub async fn feed_for_user(
        &self,
        viewer: Principal,
        request: PageRequest<FeedCursor>,
    ) -> Result<CursorPage<FeedItem>, FeedError> {
        let page = self.index.feed_index(viewer, request).await?;
        if page.items.is_empty() {
            return Ok(CursorPage::empty());
        }

        let started_at = Instant::now();
        let ids: Vec<i64> = page.items.iter().map(|entry| entry.id).collect();
        let (mut projections, stats) =
            tokio::try_join!(self.projections.projections(&ids), self.stats.stats(&ids))?;

        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(projection) = projections.remove(&id) else {
                debug!(
                    target = "quire::application::feed",
                    article_id = id,
                    "dropping indexed article without projection"
                );
                continue;
            };
            let stats = stats.get(&id).copied().unwrap_or_default();
            items.push(FeedItem::assemble(projection, stats));
        }

        histogram!(METRIC_FEED_ASSEMBLE_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
        Ok(CursorPage::new(items, page.next_cursor))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use time::macros::datetime;
    use tokio::sync::Barrier;

    use super::*;
    use crate::application::feed_index::FeedLimits;
    use crate::application::feed_index::testing::StaticIndex;
    use crate::application::projections::testing::{FakeArticles, source};
    use crate::application::repos::ArticlesRepo;
    use crate::cache::MemoryCache;
    use crate::cache::aside::testing::RecordingCache;
    use crate::domain::entities::{ArticleRef, ArticleSource, FeedIndexRow};

    fn viewer() -> Principal {
        Principal::new(7).expect("principal")
    }

    fn row(id: i64, score: f64) -> FeedIndexRow {
        FeedIndexRow {
            id,
            created_at: datetime!(2024-06-01 10:00 UTC),
            ranking_score: score,
        }
    }

    fn service(
        rows: Vec<FeedIndexRow>,
        articles: FakeArticles,
        cache: Arc<RecordingCache>,
    ) -> FeedService {
        let articles = Arc::new(articles);
        let index = Arc::new(FeedIndexService::new(
            Arc::new(StaticIndex::new(rows)),
            FeedLimits::default(),
        ));
        let projections = Arc::new(ProjectionService::new(
            cache.clone(),
            articles.clone(),
            Duration::from_secs(3600),
        ));
        let stats = Arc::new(StatsService::new(cache, articles, Duration::from_secs(30)));
        FeedService::new(index, projections, stats)
    }

    /// Both batch loaders block until the other one has started.
    struct RendezvousArticles {
        barrier: Barrier,
    }

    #[async_trait]
    impl ArticlesRepo for RendezvousArticles {
        async fn load_sources(&self, ids: &[i64]) -> Result<Vec<ArticleSource>, RepoError> {
            self.barrier.wait().await;
            Ok(ids.iter().map(|id| source(*id, &[], None)).collect())
        }

        async fn load_stats(&self, ids: &[i64]) -> Result<Vec<(i64, StatsSnapshot)>, RepoError> {
            self.barrier.wait().await;
            Ok(ids.iter().map(|id| (*id, StatsSnapshot::default())).collect())
        }

        async fn find_ref(&self, _id: i64) -> Result<Option<ArticleRef>, RepoError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn projection_and_stats_loads_overlap() {
        let articles = Arc::new(RendezvousArticles {
            barrier: Barrier::new(2),
        });
        let cache = Arc::new(MemoryCache::new());
        let feed = FeedService::new(
            Arc::new(FeedIndexService::new(
                Arc::new(StaticIndex::new(vec![row(1, 2.0), row(2, 1.0)])),
                FeedLimits::default(),
            )),
            Arc::new(ProjectionService::new(
                cache.clone(),
                articles.clone(),
                Duration::from_secs(3600),
            )),
            Arc::new(StatsService::new(cache, articles, Duration::from_secs(30))),
        );

        let page = tokio::time::timeout(
            Duration::from_secs(5),
            feed.feed_for_user(viewer(), PageRequest::new(20, None)),
        )
        .await
        .expect("loads ran one after the other")
        .expect("feed");

        let ids: Vec<i64> = page.items.iter().map(|item| item.projection.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn empty_index_makes_no_cache_calls() {
        let cache = Arc::new(RecordingCache::default());
        let feed = service(Vec::new(), FakeArticles::default(), cache.clone());

        let page = feed
            .feed_for_user(viewer(), PageRequest::new(20, None))
            .await
            .expect("empty feed");

        assert!(page.items.is_empty());
        assert!(page.next_cursor.is_none());
        assert_eq!(cache.total_calls(), 0);
    }

    #[tokio::test]
    async fn merges_projection_and_stats_in_index_order() {
        let mut articles = FakeArticles::default();
        articles.sources.insert(1, source(1, &["rust", "db"], Some("Systems")));
        articles.sources.insert(2, source(2, &[], Some("Ecology")));
        articles.sources.insert(3, source(3, &[], None));
        articles.stats.insert(
            1,
            StatsSnapshot {
                upvotes: 3,
                comments: 2,
                saves: 1,
                views: 40,
            },
        );

        let feed = service(
            vec![row(1, 9.0), row(2, 5.0), row(3, 1.0)],
            articles,
            Arc::new(RecordingCache::default()),
        );
        let page = feed
            .feed_for_user(viewer(), PageRequest::new(20, None))
            .await
            .expect("feed");

        let ids: Vec<i64> = page.items.iter().map(|item| item.projection.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(page.items[0].field, "rust");
        assert_eq!(page.items[0].stats.views, 40);
        assert_eq!(page.items[1].field, "Ecology");
        assert_eq!(page.items[2].field, FALLBACK_FIELD_LABEL);
        assert_eq!(page.items[2].stats, StatsSnapshot::default());
    }

    #[tokio::test]
    async fn index_entries_without_projection_are_dropped() {
        let articles = FakeArticles::with_articles(&[1, 3]);
        let feed = service(
            vec![row(1, 3.0), row(2, 2.0), row(3, 1.0)],
            articles,
            Arc::new(RecordingCache::default()),
        );

        let page = feed
            .feed_for_user(viewer(), PageRequest::new(20, None))
            .await
            .expect("feed");
        let ids: Vec<i64> = page.items.iter().map(|item| item.projection.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn cursor_survives_assembly() {
        let articles = FakeArticles::with_articles(&[1, 2, 3]);
        let feed = service(
            vec![row(1, 3.0), row(2, 2.0), row(3, 1.0)],
            articles,
            Arc::new(RecordingCache::default()),
        );

        let first = feed
            .feed_for_user(viewer(), PageRequest::new(2, None))
            .await
            .expect("first page");
        let cursor = FeedCursor::parse_lenient(first.next_cursor.as_deref());
        assert!(cursor.is_some());

        let second = feed
            .feed_for_user(viewer(), PageRequest::new(2, cursor))
            .await
            .expect("second page");
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].projection.id, 3);
    }

    #[test]
    fn flattened_item_shape() {
        let item = FeedItem::assemble(
            Projection::from_source(source(5, &["geo"], None)),
            StatsSnapshot {
                upvotes: 1,
                comments: 0,
                saves: 0,
                views: 2,
            },
        );
        let value = serde_json::to_value(&item).expect("serialize item");
        assert_eq!(value["id"], 5);
        assert_eq!(value["upvotes"], 1);
        assert_eq!(value["field"], "geo");
        assert!(value.get("projection").is_none());
    }
}
