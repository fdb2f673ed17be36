use async_trait::async_trait;
use sqlx::QueryBuilder;
use time::OffsetDateTime;

use crate::application::pagination::FeedCursor;
use crate::application::repos::{FeedIndexRepo, RepoError};
use crate::domain::entities::FeedIndexRow;

use super::{PostgresRepositories, map_sqlx_error};

/// Matches the partial index `articles_feed_order_idx`.
const FEED_VISIBLE_PREDICATE: &str = "a.status = 'published' AND a.tier <> 'archived'";

#[derive(sqlx::FromRow)]
struct FeedOrderRow {
    id: i64,
    created_at: OffsetDateTime,
    ranking_score: f64,
}

impl From<FeedOrderRow> for FeedIndexRow {
    fn from(row: FeedOrderRow) -> Self {
        Self {
            id: row.id,
            created_at: row.created_at,
            ranking_score: row.ranking_score,
        }
    }
}

#[async_trait]
impl FeedIndexRepo for PostgresRepositories {
    async fn list_feed_window(
        &self,
        after: Option<FeedCursor>,
        limit: u32,
    ) -> Result<Vec<FeedIndexRow>, RepoError> {
        let mut qb =
            QueryBuilder::new("SELECT a.id, a.created_at, a.ranking_score FROM articles a WHERE ");
        qb.push(FEED_VISIBLE_PREDICATE);

        if let Some(cursor) = after {
            qb.push(" AND (a.ranking_score, a.created_at, a.id) < (");
            qb.push_bind(cursor.ranking_score());
            qb.push(", ");
            qb.push_bind(cursor.created_at());
            qb.push(", ");
            qb.push_bind(cursor.id());
            qb.push(")");
        }

        qb.push(" ORDER BY a.ranking_score DESC, a.created_at DESC, a.id DESC LIMIT ");
        qb.push_bind(i64::from(limit));

        let rows = qb
            .build_query_as::<FeedOrderRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(FeedIndexRow::from).collect())
    }
}
