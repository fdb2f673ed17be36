//! Reputation leaderboard rows.

use serde::{Deserialize, Serialize};

use crate::domain::entities::ReputationRecord;
use crate::domain::projection::{AuthorCard, author_card};

pub const LEADERBOARD_SIZE: u32 = 20;

const POINTS_PER_ARTICLE: i64 = 100;
const POINTS_PER_REVIEW: i64 = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedStats {
    pub articles: i64,
    pub reviews: i64,
}

impl DerivedStats {
    pub fn from_points(points: i64) -> Self {
        Self {
            articles: points / POINTS_PER_ARTICLE,
            reviews: points / POINTS_PER_REVIEW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user: AuthorCard,
    pub points: i64,
    #[serde(flatten)]
    pub stats: DerivedStats,
}

impl LeaderboardEntry {
    pub fn from_record(rank: u32, record: &ReputationRecord) -> Self {
        Self {
            rank,
            user: author_card(
                record.display_name.as_deref(),
                record.email.as_deref(),
                record.avatar_url.as_deref(),
            ),
            points: record.reputation,
            stats: DerivedStats::from_points(record.reputation),
        }
    }
}

/// Assigns `rank = index + 1` over rows already ordered by reputation.
pub fn rank_records(records: &[ReputationRecord]) -> Vec<LeaderboardEntry> {
    records
        .iter()
        .zip(1u32..)
        .map(|(record, rank)| LeaderboardEntry::from_record(rank, record))
        .collect()
}
