mod support;

use std::sync::Arc;
use std::time::Duration;

use quire::application::feed::FeedService;
use quire::application::feed_index::{FeedIndexService, FeedLimits};
use quire::application::pagination::{FeedCursor, PageRequest};
use quire::application::projections::ProjectionService;
use quire::application::stats::StatsService;
use quire::cache::MemoryCache;
use quire::domain::principal::Principal;
use quire::infra::db::PostgresRepositories;
use sqlx::PgPool;
use time::macros::datetime;

use support::{ArticleSeed, insert_article, insert_user};

fn viewer() -> Principal {
    Principal::new(1).expect("principal")
}

fn index_service(pool: PgPool) -> FeedIndexService {
    let repos = Arc::new(PostgresRepositories::new(pool));
    FeedIndexService::new(repos, FeedLimits::default())
}

#[sqlx::test(migrations = "./migrations")]
async fn pages_follow_score_then_recency_then_id(pool: PgPool) {
    let author = insert_user(&pool, "author@example.com", 0).await;
    insert_article(
        &pool,
        ArticleSeed::published(1, author, 5.0, datetime!(2024-05-01 09:00 UTC)),
    )
    .await;
    insert_article(
        &pool,
        ArticleSeed::published(2, author, 10.0, datetime!(2024-05-02 09:00 UTC)),
    )
    .await;
    insert_article(
        &pool,
        ArticleSeed::published(3, author, 10.0, datetime!(2024-05-03 09:00 UTC)),
    )
    .await;

    let index = index_service(pool);

    let first = index
        .feed_index(viewer(), PageRequest::new(2, None))
        .await
        .expect("first page");
    let ids: Vec<i64> = first.items.iter().map(|entry| entry.id).collect();
    assert_eq!(ids, vec![3, 2]);

    let token = first.next_cursor.expect("more rows remain");
    let cursor = FeedCursor::decode(&token).expect("cursor decodes");
    assert_eq!(cursor.id(), 2);
    assert_eq!(cursor.ranking_score(), 10.0);
    assert_eq!(cursor.created_at(), datetime!(2024-05-02 09:00 UTC));

    let second = index
        .feed_index(viewer(), PageRequest::new(2, Some(cursor)))
        .await
        .expect("second page");
    let ids: Vec<i64> = second.items.iter().map(|entry| entry.id).collect();
    assert_eq!(ids, vec![1]);
    assert!(second.next_cursor.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn identical_score_and_timestamp_fall_back_to_id(pool: PgPool) {
    let author = insert_user(&pool, "author@example.com", 0).await;
    let created_at = datetime!(2024-05-01 09:00 UTC);
    for id in 1..=7 {
        insert_article(&pool, ArticleSeed::published(id, author, 1.0, created_at)).await;
    }

    let index = index_service(pool);
    let mut seen = Vec::new();
    let mut cursor = None;
    loop {
        let page = index
            .feed_index(viewer(), PageRequest::new(3, cursor))
            .await
            .expect("page");
        seen.extend(page.items.iter().map(|entry| entry.id));
        match page.next_cursor {
            Some(token) => cursor = Some(FeedCursor::decode(&token).expect("cursor")),
            None => break,
        }
    }

    assert_eq!(seen, vec![7, 6, 5, 4, 3, 2, 1]);
}

#[sqlx::test(migrations = "./migrations")]
async fn non_finite_scores_resume_without_repeats(pool: PgPool) {
    let author = insert_user(&pool, "author@example.com", 0).await;
    let created_at = datetime!(2024-05-01 09:00 UTC);
    insert_article(&pool, ArticleSeed::published(1, author, 5.0, created_at)).await;
    insert_article(&pool, ArticleSeed::published(2, author, 10.0, created_at)).await;
    insert_article(&pool, ArticleSeed::published(3, author, f64::INFINITY, created_at)).await;
    insert_article(&pool, ArticleSeed::published(4, author, f64::NAN, created_at)).await;

    let index = index_service(pool);
    let mut seen = Vec::new();
    let mut cursor = None;
    for _ in 0..10 {
        let page = index
            .feed_index(viewer(), PageRequest::new(1, cursor))
            .await
            .expect("page");
        seen.extend(page.items.iter().map(|entry| entry.id));
        match page.next_cursor {
            Some(token) => {
                cursor = Some(FeedCursor::decode(&token).expect("cursor decodes"));
            }
            None => break,
        }
    }

    // Postgres sorts NaN above every other value.
    assert_eq!(seen, vec![4, 3, 2, 1]);
}

#[sqlx::test(migrations = "./migrations")]
async fn hidden_articles_never_reach_the_index(pool: PgPool) {
    let author = insert_user(&pool, "author@example.com", 0).await;
    let created_at = datetime!(2024-05-01 09:00 UTC);
    insert_article(&pool, ArticleSeed::published(1, author, 1.0, created_at)).await;
    insert_article(
        &pool,
        ArticleSeed {
            status: "draft",
            ..ArticleSeed::published(2, author, 50.0, created_at)
        },
    )
    .await;
    insert_article(
        &pool,
        ArticleSeed {
            tier: "archived",
            ..ArticleSeed::published(3, author, 90.0, created_at)
        },
    )
    .await;

    let page = index_service(pool)
        .feed_index(viewer(), PageRequest::new(10, None))
        .await
        .expect("page");
    let ids: Vec<i64> = page.items.iter().map(|entry| entry.id).collect();
    assert_eq!(ids, vec![1]);
    assert!(page.next_cursor.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn assembled_feed_carries_projection_and_counters(pool: PgPool) {
    let author = insert_user(&pool, "writer@example.com", 0).await;
    sqlx::query("INSERT INTO profiles (user_id, display_name) VALUES ($1, 'Writer')")
        .bind(author)
        .execute(&pool)
        .await
        .expect("profile");
    let category: i64 = sqlx::query_scalar(
        "INSERT INTO categories (name, slug) VALUES ('Systems', 'systems') RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .expect("category");
    insert_article(
        &pool,
        ArticleSeed::published(1, author, 3.0, datetime!(2024-05-01 09:00 UTC)),
    )
    .await;
    sqlx::query(
        "UPDATE articles SET category_id = $1, upvote_count = 4, view_count = 9 WHERE id = 1",
    )
    .bind(category)
    .execute(&pool)
    .await
    .expect("counters");

    let repos = Arc::new(PostgresRepositories::new(pool));
    let cache = Arc::new(MemoryCache::new());
    let ttl = Duration::from_secs(60);
    let feed = FeedService::new(
        Arc::new(FeedIndexService::new(repos.clone(), FeedLimits::default())),
        Arc::new(ProjectionService::new(cache.clone(), repos.clone(), ttl)),
        Arc::new(StatsService::new(cache.clone(), repos, ttl)),
    );

    let page = feed
        .feed_for_user(viewer(), PageRequest::new(20, None))
        .await
        .expect("feed page");
    assert_eq!(page.items.len(), 1);
    let item = &page.items[0];
    assert_eq!(item.projection.author.name, "Writer");
    assert_eq!(item.field, "Systems");
    assert_eq!(item.stats.upvotes, 4);
    assert_eq!(item.stats.views, 9);
    assert!(!cache.is_empty());
}
