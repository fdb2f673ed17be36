#![allow(dead_code)]

use sqlx::PgPool;
use time::OffsetDateTime;

pub async fn insert_user(pool: &PgPool, email: &str, reputation: i64) -> i64 {
    insert_user_with_role(pool, email, reputation, "user").await
}

pub async fn insert_user_with_role(
    pool: &PgPool,
    email: &str,
    reputation: i64,
    role: &str,
) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO users (email, role, reputation_score)
        VALUES ($1, $2::user_role, $3)
        RETURNING id
        "#,
    )
    .bind(email)
    .bind(role)
    .bind(reputation)
    .fetch_one(pool)
    .await
    .expect("insert user")
}

pub struct ArticleSeed<'a> {
    pub id: i64,
    pub author_id: i64,
    pub title: &'a str,
    pub ranking_score: f64,
    pub created_at: OffsetDateTime,
    pub status: &'a str,
    pub tier: &'a str,
}

impl<'a> ArticleSeed<'a> {
    pub fn published(
        id: i64,
        author_id: i64,
        ranking_score: f64,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            author_id,
            title: "Seeded article",
            ranking_score,
            created_at,
            status: "published",
            tier: "tier_1_discovery",
        }
    }
}

pub async fn insert_article(pool: &PgPool, seed: ArticleSeed<'_>) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO articles
            (id, author_id, title, content, status, tier, ranking_score, created_at)
        VALUES ($1, $2, $3, 'Body text', $4::article_status, $5::article_tier, $6, $7)
        RETURNING id
        "#,
    )
    .bind(seed.id)
    .bind(seed.author_id)
    .bind(seed.title)
    .bind(seed.status)
    .bind(seed.tier)
    .bind(seed.ranking_score)
    .bind(seed.created_at)
    .fetch_one(pool)
    .await
    .expect("insert article")
}
