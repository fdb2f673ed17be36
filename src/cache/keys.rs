//! Cache key definitions.

use std::fmt;

use crate::domain::types::ScoringEntity;

/// Every key the service writes. Rendering is the single source of the
/// on-the-wire key format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    PostProjection(i64),
    PostStats(i64),
    LeaderboardTop,
    ScoringDebounce(ScoringEntity, i64),
}

impl CacheKey {
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::PostProjection(id) => write!(f, "post_projection:{id}"),
            CacheKey::PostStats(id) => write!(f, "post_stats:{id}"),
            CacheKey::LeaderboardTop => f.write_str("leaderboard:top20"),
            CacheKey::ScoringDebounce(entity, id) => {
                write!(f, "debounce:score:{}:{id}", entity.as_str())
            }
        }
    }
}
