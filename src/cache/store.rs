//! Key-value cache contract shared by the read path and the debouncer.
//!
//! Entries are advisory: every caller must tolerate a cache that loses data,
//! times out, or is unreachable.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache operation `{op}` timed out")]
    Timeout { op: &'static str },
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

impl CacheError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// One value of a batched write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub value: String,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ttl,
        }
    }
}

#[async_trait]
pub trait KvCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Values are returned positionally; absent or expired keys yield `None`.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError>;

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Atomic set-if-absent. Returns `true` when this call created the entry.
    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, CacheError>;

    /// Batched write. Not atomic across entries.
    async fn mset_ex(&self, entries: Vec<CacheEntry>) -> Result<(), CacheError>;

    /// Drops expired entries, returning how many were removed.
    async fn purge_expired(&self) -> Result<u64, CacheError>;
}

/// Wraps a backend so that no single operation can outlive the configured
/// deadline.
pub struct BoundedCache {
    inner: Arc<dyn KvCache>,
    timeout: Duration,
}

impl BoundedCache {
    pub fn new(inner: Arc<dyn KvCache>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T, CacheError>> + Send,
    ) -> Result<T, CacheError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout { op }),
        }
    }
}

#[async_trait]
impl KvCache for BoundedCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.bounded("get", self.inner.get(key)).await
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
        self.bounded("mget", self.inner.mget(keys)).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.bounded("set_ex", self.inner.set_ex(key, value, ttl))
            .await
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, CacheError> {
        self.bounded("set_nx_ex", self.inner.set_nx_ex(key, value, ttl))
            .await
    }

    async fn mset_ex(&self, entries: Vec<CacheEntry>) -> Result<(), CacheError> {
        self.bounded("mset_ex", self.inner.mset_ex(entries)).await
    }

    async fn purge_expired(&self) -> Result<u64, CacheError> {
        self.bounded("purge_expired", self.inner.purge_expired())
            .await
    }
}
