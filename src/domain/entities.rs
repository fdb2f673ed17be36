//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Sort key of a feed-visible article, as read by the feed index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedIndexRow {
    pub id: i64,
    pub created_at: OffsetDateTime,
    pub ranking_score: f64,
}

/// Entry returned by the feed index to downstream assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedIndexEntry {
    pub id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<FeedIndexRow> for FeedIndexEntry {
    fn from(row: FeedIndexRow) -> Self {
        Self {
            id: row.id,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRecord {
    pub name: String,
    pub slug: String,
}

/// First place-typed context attached to an article. Coordinates are
/// optional in storage.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceRecord {
    pub name: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// Everything needed to build a projection for one article.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleSource {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub author_email: Option<String>,
    pub author_display_name: Option<String>,
    pub author_avatar_url: Option<String>,
    pub category: Option<CategoryRecord>,
    pub tags: Vec<String>,
    pub place: Option<PlaceRecord>,
}

/// Engagement counters of an article at read time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub upvotes: i64,
    pub comments: i64,
    pub saves: i64,
    pub views: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArticleRef {
    pub id: i64,
    pub author_id: i64,
}

/// A user row as ranked by reputation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReputationRecord {
    pub user_id: i64,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub reputation: i64,
}
