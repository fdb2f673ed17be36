use async_trait::async_trait;
use sqlx::{Postgres, Transaction};

use crate::application::repos::{
    EngagementWriteRepo, InteractionWrite, RecordInteractionParams, RepoError,
};
use crate::domain::types::InteractionKind;

use super::{PostgresRepositories, map_sqlx_error};

impl PostgresRepositories {
    async fn claim_vote(
        tx: &mut Transaction<'_, Postgres>,
        params: &RecordInteractionParams,
    ) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"
            INSERT INTO votes (user_id, article_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, article_id) DO NOTHING
            "#,
        )
        .bind(params.user_id)
        .bind(params.article_id)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn recently_viewed(
        tx: &mut Transaction<'_, Postgres>,
        params: &RecordInteractionParams,
    ) -> Result<bool, RepoError> {
        let window_secs = params.view_window.as_secs_f64();
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                  FROM interactions
                 WHERE user_id = $1
                   AND article_id = $2
                   AND kind = 'view'
                   AND created_at > now() - make_interval(secs => $3)
            )
            "#,
        )
        .bind(params.user_id)
        .bind(params.article_id)
        .bind(window_secs)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl EngagementWriteRepo for PostgresRepositories {
    async fn record_interaction(
        &self,
        params: RecordInteractionParams,
    ) -> Result<InteractionWrite, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let suppressed = match params.kind {
            InteractionKind::Upvote => !Self::claim_vote(&mut tx, &params).await?,
            InteractionKind::View => Self::recently_viewed(&mut tx, &params).await?,
            InteractionKind::Save | InteractionKind::Comment => false,
        };
        if suppressed {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Ok(InteractionWrite::Suppressed);
        }

        sqlx::query("INSERT INTO interactions (user_id, article_id, kind) VALUES ($1, $2, $3)")
            .bind(params.user_id)
            .bind(params.article_id)
            .bind(params.kind)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let column = params.kind.counter_column();
        let update = format!(
            "UPDATE articles SET {column} = {column} + 1, updated_at = now() WHERE id = $1"
        );
        let result = sqlx::query(&update)
            .bind(params.article_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Err(RepoError::NotFound);
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(InteractionWrite::Counted)
    }
}
