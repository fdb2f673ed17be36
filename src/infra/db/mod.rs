//! Postgres-backed repository implementations.

mod articles;
mod cache;
mod engagement;
mod feed;
mod jobs;
mod users;
mod util;

pub use cache::PostgresCache;
pub use util::map_sqlx_error;

use std::sync::Arc;
use std::time::Duration;

use apalis_sql::postgres::PostgresStorage;
use async_trait::async_trait;
use sqlx::migrate::MigrateError;
use sqlx::{
    Postgres, Transaction,
    postgres::{PgConnectOptions, PgPool, PgPoolOptions},
    query,
};

use crate::application::repos::{HealthRepo, RepoError};

/// Pool sizing and per-statement limits.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub statement_timeout: Duration,
}

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }

    /// Every connection carries a server-side `statement_timeout` so a slow
    /// store surfaces as [`RepoError::Timeout`] instead of hanging a request.
    pub async fn connect(url: &str, options: &PoolOptions) -> Result<PgPool, sqlx::Error> {
        let statement_timeout_ms = options.statement_timeout.as_millis().to_string();
        let connect_options = url
            .parse::<PgConnectOptions>()?
            .options([("statement_timeout", statement_timeout_ms.as_str())]);

        PgPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect_with(connect_options)
            .await
    }

    /// Applies the feed schema. The queue schema shares the migrations
    /// table, so versions owned by the other migrator are ignored.
    pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
        let mut migrator = sqlx::migrate!("./migrations");
        migrator.set_ignore_missing(true);
        migrator.run(pool).await
    }

    /// Creates the `apalis` schema used by the job queue.
    pub async fn run_queue_migrations(pool: &PgPool) -> Result<(), MigrateError> {
        let mut migrator = PostgresStorage::migrations();
        migrator.set_ignore_missing(true);
        migrator.run(pool).await
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    fn convert_count(value: i64) -> Result<u64, RepoError> {
        value
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }
}

#[async_trait]
impl HealthRepo for PostgresRepositories {
    async fn ping(&self) -> Result<(), RepoError> {
        self.health_check().await.map_err(map_sqlx_error)
    }
}
