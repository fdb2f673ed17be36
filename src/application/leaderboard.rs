//! Reputation leaderboard: a shared cached top list plus a fresh
//! per-viewer rank.
//!
//! Values are a social signal only and are eventually consistent with the
//! scoring worker.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::repos::{RepoError, ReputationRepo};
use crate::cache::{CacheKey, KvCache, fetch_one};
use crate::domain::leaderboard::{LEADERBOARD_SIZE, LeaderboardEntry, rank_records};
use crate::domain::principal::Principal;

#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardView {
    pub leaderboard: Vec<LeaderboardEntry>,
    pub current_user: Option<LeaderboardEntry>,
}

pub struct LeaderboardService {
    cache: Arc<dyn KvCache>,
    repo: Arc<dyn ReputationRepo>,
    ttl: Duration,
}

impl LeaderboardService {
    pub fn new(cache: Arc<dyn KvCache>, repo: Arc<dyn ReputationRepo>, ttl: Duration) -> Self {
        Self { cache, repo, ttl }
    }

    pub async fn top_users(
        &self,
        viewer: Option<Principal>,
    ) -> Result<LeaderboardView, LeaderboardError> {
        let repo = Arc::clone(&self.repo);
        let leaderboard = fetch_one(
            self.cache.as_ref(),
            "leaderboard",
            CacheKey::LeaderboardTop,
            self.ttl,
            || async move {
                let records = repo.list_top_users(LEADERBOARD_SIZE).await?;
                Ok::<_, RepoError>(rank_records(&records))
            },
        )
        .await?;

        let current_user = match viewer {
            Some(principal) => self.current_entry(principal).await?,
            None => None,
        };

        Ok(LeaderboardView {
            leaderboard,
            current_user,
        })
    }

    /// Never cached: one entry per viewer would fragment the cache.
    async fn current_entry(
        &self,
        principal: Principal,
    ) -> Result<Option<LeaderboardEntry>, RepoError> {
        let Some(record) = self.repo.find_user(principal.user_id()).await? else {
            return Ok(None);
        };
        let above = self.repo.count_users_above(record.reputation).await?;
        let rank = u32::try_from(above.saturating_add(1)).unwrap_or(u32::MAX);
        Ok(Some(LeaderboardEntry::from_record(rank, &record)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::cache::aside::testing::{DownCache, RecordingCache};
    use crate::domain::entities::ReputationRecord;

    const TTL: Duration = Duration::from_secs(60);

    struct FakeReputation {
        users: Vec<ReputationRecord>,
        top_calls: AtomicUsize,
    }

    impl FakeReputation {
        /// User `n` has reputation `n * 10`, so higher ids rank higher.
        fn seeded(count: i64) -> Self {
            let users = (1..=count)
                .map(|id| ReputationRecord {
                    user_id: id,
                    email: Some(format!("user{id}@example.com")),
                    display_name: None,
                    avatar_url: None,
                    reputation: id * 10,
                })
                .collect();
            Self {
                users,
                top_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ReputationRepo for FakeReputation {
        async fn list_top_users(&self, limit: u32) -> Result<Vec<ReputationRecord>, RepoError> {
            self.top_calls.fetch_add(1, Ordering::SeqCst);
            let mut users = self.users.clone();
            users.sort_by(|a, b| {
                b.reputation
                    .cmp(&a.reputation)
                    .then(a.user_id.cmp(&b.user_id))
            });
            users.truncate(limit as usize);
            Ok(users)
        }

        async fn find_user(&self, user_id: i64) -> Result<Option<ReputationRecord>, RepoError> {
            Ok(self.users.iter().find(|u| u.user_id == user_id).cloned())
        }

        async fn count_users_above(&self, reputation: i64) -> Result<u64, RepoError> {
            let above = self.users.iter().filter(|u| u.reputation > reputation);
            Ok(above.count() as u64)
        }
    }

    #[tokio::test]
    async fn viewer_outside_top_twenty_gets_fresh_rank() {
        let repo = Arc::new(FakeReputation::seeded(25));
        let service =
            LeaderboardService::new(Arc::new(RecordingCache::default()), repo.clone(), TTL);

        let viewer = Principal::new(3).expect("principal");
        let view = service.top_users(Some(viewer)).await.expect("leaderboard");

        assert_eq!(view.leaderboard.len(), 20);
        let ranks: Vec<u32> = view.leaderboard.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, (1..=20).collect::<Vec<_>>());
        assert_eq!(view.leaderboard[0].points, 250);

        let current = view.current_user.expect("viewer entry");
        assert_eq!(current.rank, 23);
        assert_eq!(current.points, 30);
    }

    #[tokio::test]
    async fn top_list_is_cached_but_viewer_rank_is_not() {
        let repo = Arc::new(FakeReputation::seeded(5));
        let cache = Arc::new(RecordingCache::default());
        let service = LeaderboardService::new(cache.clone(), repo.clone(), TTL);

        let viewer = Principal::new(1).expect("principal");
        service.top_users(Some(viewer)).await.expect("first");
        let second = service.top_users(Some(viewer)).await.expect("second");

        assert_eq!(repo.top_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.current_user.map(|e| e.rank), Some(5));
        let batches = cache.write_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0][0].key, "leaderboard:top20");
        assert_eq!(batches[0][0].ttl, TTL);
    }

    #[tokio::test]
    async fn unknown_or_absent_viewer_has_no_entry() {
        let service = LeaderboardService::new(
            Arc::new(RecordingCache::default()),
            Arc::new(FakeReputation::seeded(3)),
            TTL,
        );

        let anonymous = service.top_users(None).await.expect("anonymous");
        assert!(anonymous.current_user.is_none());

        let ghost = Principal::new(999).expect("principal");
        let view = service.top_users(Some(ghost)).await.expect("unknown viewer");
        assert!(view.current_user.is_none());
        assert_eq!(view.leaderboard.len(), 3);
    }

    #[tokio::test]
    async fn cache_outage_still_serves_store_results() {
        let repo = Arc::new(FakeReputation::seeded(4));
        let service = LeaderboardService::new(Arc::new(DownCache), repo.clone(), TTL);

        let view = service.top_users(None).await.expect("fails open");
        assert_eq!(view.leaderboard.len(), 4);
        service.top_users(None).await.expect("fails open again");
        assert_eq!(repo.top_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn view_uses_camel_case_on_the_wire() {
        let view = LeaderboardView {
            leaderboard: Vec::new(),
            current_user: None,
        };
        let value = serde_json::to_value(&view).expect("serialize view");
        assert!(value.get("currentUser").is_some());
    }
}
