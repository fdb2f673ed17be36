//! Cache-aside batch retrieval of article projections.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::application::repos::{ArticlesRepo, RepoError};
use crate::cache::{BatchFamily, CacheKey, KvCache, fetch_batch};
use crate::domain::projection::Projection;

pub struct ProjectionService {
    cache: Arc<dyn KvCache>,
    articles: Arc<dyn ArticlesRepo>,
    family: BatchFamily,
}

impl ProjectionService {
    pub fn new(cache: Arc<dyn KvCache>, articles: Arc<dyn ArticlesRepo>, ttl: Duration) -> Self {
        Self {
            cache,
            articles,
            family: BatchFamily {
                name: "projection",
                key: CacheKey::PostProjection,
                ttl,
            },
        }
    }

    /// Projections for the requested ids. Ids unknown to the store are absent.
    pub async fn projections(&self, ids: &[i64]) -> Result<HashMap<i64, Projection>, RepoError> {
        let articles = Arc::clone(&self.articles);
        fetch_batch(self.cache.as_ref(), self.family, ids, |missing| async move {
            let sources = articles.load_sources(&missing).await?;
            Ok::<_, RepoError>(
                sources
                    .into_iter()
                    .map(|source| (source.id, Projection::from_source(source)))
                    .collect(),
            )
        })
        .await
    }
}


#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::testing::FakeArticles;
    use super::*;
    use crate::cache::aside::testing::{DownCache, RecordingCache};

    const TTL: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let cache = Arc::new(RecordingCache::default());
        let articles = Arc::new(FakeArticles::with_articles(&[1, 2, 3]));
        let service = ProjectionService::new(cache.clone(), articles.clone(), TTL);

        let first = service.projections(&[1, 2, 3]).await.expect("first read");
        let second = service.projections(&[3, 2, 1]).await.expect("second read");

        assert_eq!(first, second);
        assert_eq!(articles.source_batches(), vec![vec![1, 2, 3]]);
        assert_eq!(cache.write_batches().len(), 1);
        assert!(cache.write_batches()[0].iter().all(|e| e.ttl == TTL));
    }

    #[tokio::test]
    async fn partial_hits_only_load_the_rest() {
        let cache = Arc::new(RecordingCache::default());
        let articles = Arc::new(FakeArticles::with_articles(&[1, 2, 3, 4, 5]));
        let service = ProjectionService::new(cache.clone(), articles.clone(), TTL);

        service.projections(&[1, 2]).await.expect("warm");
        let result = service
            .projections(&[1, 2, 3, 4, 5])
            .await
            .expect("mixed read");

        assert_eq!(result.len(), 5);
        assert_eq!(articles.source_batches()[1], vec![3, 4, 5]);
        let batches = cache.write_batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].len(), 3);
    }

    #[tokio::test]
    async fn unknown_ids_are_absent() {
        let cache = Arc::new(RecordingCache::default());
        let articles = Arc::new(FakeArticles::with_articles(&[1]));
        let service = ProjectionService::new(cache, articles, TTL);

        let result = service.projections(&[1, 404]).await.expect("read");
        assert!(result.contains_key(&1));
        assert!(!result.contains_key(&404));
    }

    #[tokio::test]
    async fn cache_outage_fails_open() {
        let articles = Arc::new(FakeArticles::with_articles(&[1, 2]));
        let service = ProjectionService::new(Arc::new(DownCache), articles, TTL);

        let result = service.projections(&[1, 2]).await.expect("store fallback");
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn store_failure_is_fatal() {
        let articles = Arc::new(FakeArticles {
            fail: true,
            ..FakeArticles::default()
        });
        let service = ProjectionService::new(Arc::new(RecordingCache::default()), articles, TTL);

        let err = service.projections(&[1]).await.expect_err("store down");
        assert!(matches!(err, RepoError::Timeout));
    }
}
