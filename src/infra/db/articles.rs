use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{ArticlesRepo, RepoError};
use crate::domain::entities::{
    ArticleRef, ArticleSource, CategoryRecord, PlaceRecord, StatsSnapshot,
};

use super::{PostgresRepositories, map_sqlx_error};

const PLACE_CONTEXT_KIND: &str = "place";

#[derive(sqlx::FromRow)]
struct ArticleSourceRow {
    id: i64,
    title: String,
    content: String,
    created_at: OffsetDateTime,
    author_email: Option<String>,
    author_display_name: Option<String>,
    author_avatar_url: Option<String>,
    category_name: Option<String>,
    category_slug: Option<String>,
    tags: Vec<String>,
    place_name: Option<String>,
    place_lat: Option<f64>,
    place_lng: Option<f64>,
}

impl From<ArticleSourceRow> for ArticleSource {
    fn from(row: ArticleSourceRow) -> Self {
        let category = match (row.category_name, row.category_slug) {
            (Some(name), Some(slug)) => Some(CategoryRecord { name, slug }),
            _ => None,
        };
        let place = row.place_name.map(|name| PlaceRecord {
            name,
            lat: row.place_lat,
            lng: row.place_lng,
        });

        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            created_at: row.created_at,
            author_email: row.author_email,
            author_display_name: row.author_display_name,
            author_avatar_url: row.author_avatar_url,
            category,
            tags: row.tags,
            place,
        }
    }
}

#[derive(sqlx::FromRow)]
struct StatsRow {
    id: i64,
    upvote_count: i64,
    comment_count: i64,
    save_count: i64,
    view_count: i64,
}

impl From<StatsRow> for (i64, StatsSnapshot) {
    fn from(row: StatsRow) -> Self {
        (
            row.id,
            StatsSnapshot {
                upvotes: row.upvote_count,
                comments: row.comment_count,
                saves: row.save_count,
                views: row.view_count,
            },
        )
    }
}

#[async_trait]
impl ArticlesRepo for PostgresRepositories {
    async fn load_sources(&self, ids: &[i64]) -> Result<Vec<ArticleSource>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // Tags keep their attachment order; the place is the oldest
        // place-typed context.
        let rows = sqlx::query_as::<_, ArticleSourceRow>(
            r#"
            SELECT a.id, a.title, a.content, a.created_at,
                   u.email AS author_email,
                   p.display_name AS author_display_name,
                   p.avatar_url AS author_avatar_url,
                   c.name AS category_name,
                   c.slug AS category_slug,
                   COALESCE(t.tags, ARRAY[]::TEXT[]) AS tags,
                   pl.name AS place_name,
                   pl.lat AS place_lat,
                   pl.lng AS place_lng
              FROM articles a
              JOIN users u ON u.id = a.author_id
              LEFT JOIN profiles p ON p.user_id = a.author_id
              LEFT JOIN categories c ON c.id = a.category_id
              LEFT JOIN LATERAL (
                    SELECT array_agg(tg.name ORDER BY at.position, tg.id) AS tags
                      FROM article_tags at
                      JOIN tags tg ON tg.id = at.tag_id
                     WHERE at.article_id = a.id
              ) t ON TRUE
              LEFT JOIN LATERAL (
                    SELECT ctx.name, ctx.lat, ctx.lng
                      FROM article_contexts ac
                      JOIN contexts ctx ON ctx.id = ac.context_id
                     WHERE ac.article_id = a.id AND ctx.kind = $2
                     ORDER BY ctx.id
                     LIMIT 1
              ) pl ON TRUE
             WHERE a.id = ANY($1)
            "#,
        )
        .bind(ids)
        .bind(PLACE_CONTEXT_KIND)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ArticleSource::from).collect())
    }

    async fn load_stats(&self, ids: &[i64]) -> Result<Vec<(i64, StatsSnapshot)>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, StatsRow>(
            r#"
            SELECT id, upvote_count, comment_count, save_count, view_count
              FROM articles
             WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_ref(&self, id: i64) -> Result<Option<ArticleRef>, RepoError> {
        let row =
            sqlx::query_as::<_, (i64, i64)>("SELECT id, author_id FROM articles WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(row.map(|(id, author_id)| ArticleRef { id, author_id }))
    }
}
