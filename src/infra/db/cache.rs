//! Shared cache backend stored in an unlogged Postgres table.
//!
//! Lets several processes share projections and debounce leases without a
//! separate cache server. Losing the table loses nothing but warm entries.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::cache::{CacheEntry, CacheError, KvCache};

#[derive(Clone)]
pub struct PostgresCache {
    pool: PgPool,
}

impl PostgresCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn ttl_secs(ttl: Duration) -> f64 {
    ttl.as_secs_f64()
}

#[async_trait]
impl KvCache for PostgresCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        sqlx::query_scalar::<_, String>(
            "SELECT value FROM cache_entries WHERE key = $1 AND expires_at > now()",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(CacheError::unavailable)
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT key, value FROM cache_entries WHERE key = ANY($1) AND expires_at > now()",
        )
        .bind(keys)
        .fetch_all(&self.pool)
        .await
        .map_err(CacheError::unavailable)?;

        let mut found: HashMap<String, String> = rows.into_iter().collect();
        Ok(keys.iter().map(|key| found.remove(key)).collect())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, value, expires_at)
            VALUES ($1, $2, now() + make_interval(secs => $3))
            ON CONFLICT (key) DO UPDATE
               SET value = EXCLUDED.value,
                   expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(ttl_secs(ttl))
        .execute(&self.pool)
        .await
        .map_err(CacheError::unavailable)?;
        Ok(())
    }

    /// An expired row counts as absent and is taken over in place.
    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, CacheError> {
        let claimed: Option<String> = sqlx::query_scalar(
            r#"
            INSERT INTO cache_entries (key, value, expires_at)
            VALUES ($1, $2, now() + make_interval(secs => $3))
            ON CONFLICT (key) DO UPDATE
               SET value = EXCLUDED.value,
                   expires_at = EXCLUDED.expires_at
             WHERE cache_entries.expires_at <= now()
            RETURNING key
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(ttl_secs(ttl))
        .fetch_optional(&self.pool)
        .await
        .map_err(CacheError::unavailable)?;

        Ok(claimed.is_some())
    }

    async fn mset_ex(&self, entries: Vec<CacheEntry>) -> Result<(), CacheError> {
        // ON CONFLICT cannot touch the same key twice in one statement.
        let mut latest: HashMap<String, (String, f64)> = HashMap::with_capacity(entries.len());
        for entry in entries {
            latest.insert(entry.key, (entry.value, ttl_secs(entry.ttl)));
        }
        if latest.is_empty() {
            return Ok(());
        }

        let mut keys = Vec::with_capacity(latest.len());
        let mut values = Vec::with_capacity(latest.len());
        let mut ttls = Vec::with_capacity(latest.len());
        for (key, (value, ttl)) in latest {
            keys.push(key);
            values.push(value);
            ttls.push(ttl);
        }

        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, value, expires_at)
            SELECT k, v, now() + make_interval(secs => s)
              FROM UNNEST($1::TEXT[], $2::TEXT[], $3::FLOAT8[]) AS t(k, v, s)
            ON CONFLICT (key) DO UPDATE
               SET value = EXCLUDED.value,
                   expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(&keys)
        .bind(&values)
        .bind(&ttls)
        .execute(&self.pool)
        .await
        .map_err(CacheError::unavailable)?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, CacheError> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE expires_at <= now()")
            .execute(&self.pool)
            .await
            .map_err(CacheError::unavailable)?;
        Ok(result.rows_affected())
    }
}
