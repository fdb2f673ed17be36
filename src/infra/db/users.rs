use async_trait::async_trait;

use crate::application::repos::{RepoError, ReputationRepo};
use crate::domain::entities::ReputationRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct ReputationRow {
    id: i64,
    email: Option<String>,
    display_name: Option<String>,
    avatar_url: Option<String>,
    reputation_score: i64,
}

impl From<ReputationRow> for ReputationRecord {
    fn from(row: ReputationRow) -> Self {
        Self {
            user_id: row.id,
            email: row.email,
            display_name: row.display_name,
            avatar_url: row.avatar_url,
            reputation: row.reputation_score,
        }
    }
}

#[async_trait]
impl ReputationRepo for PostgresRepositories {
    async fn list_top_users(&self, limit: u32) -> Result<Vec<ReputationRecord>, RepoError> {
        let rows = sqlx::query_as::<_, ReputationRow>(
            r#"
            SELECT u.id, u.email, p.display_name, p.avatar_url, u.reputation_score
              FROM users u
              LEFT JOIN profiles p ON p.user_id = u.id
             WHERE u.role = 'user'
             ORDER BY u.reputation_score DESC, u.id ASC
             LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ReputationRecord::from).collect())
    }

    async fn find_user(&self, user_id: i64) -> Result<Option<ReputationRecord>, RepoError> {
        let row = sqlx::query_as::<_, ReputationRow>(
            r#"
            SELECT u.id, u.email, p.display_name, p.avatar_url, u.reputation_score
              FROM users u
              LEFT JOIN profiles p ON p.user_id = u.id
             WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ReputationRecord::from))
    }

    async fn count_users_above(&self, reputation: i64) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE role = 'user' AND reputation_score > $1",
        )
        .bind(reputation)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }
}
