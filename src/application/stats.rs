//! Short-lived engagement counters, cache-aside.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::application::repos::{ArticlesRepo, RepoError};
use crate::cache::{BatchFamily, CacheKey, KvCache, fetch_batch};
use crate::domain::entities::StatsSnapshot;

pub struct StatsService {
    cache: Arc<dyn KvCache>,
    articles: Arc<dyn ArticlesRepo>,
    family: BatchFamily,
}

impl StatsService {
    pub fn new(cache: Arc<dyn KvCache>, articles: Arc<dyn ArticlesRepo>, ttl: Duration) -> Self {
        Self {
            cache,
            articles,
            family: BatchFamily {
                name: "stats",
                key: CacheKey::PostStats,
                ttl,
            },
        }
    }

    pub async fn stats(&self, ids: &[i64]) -> Result<HashMap<i64, StatsSnapshot>, RepoError> {
        let articles = Arc::clone(&self.articles);
        fetch_batch(self.cache.as_ref(), self.family, ids, |missing| async move {
            Ok::<_, RepoError>(articles.load_stats(&missing).await?.into_iter().collect())
        })
        .await
    }
}
